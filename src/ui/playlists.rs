use crate::app::{App, InputMode, Loadable};
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
};

use super::grid;

pub fn render(app: &App, frame: &mut Frame, area: Rect) {
    if let Some(open) = &app.playlists.open {
        let title = format!(" {} {} ", open.icon(), open.name);
        grid::render(frame, area, &app.playlists.contents, &title, app.grid_columns);
        return;
    }

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(3)])
        .split(area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" Playlists ");

    match &app.playlists.lists {
        Loadable::Loaded { items, .. } if !items.is_empty() => {
            let rows: Vec<ListItem> = items
                .iter()
                .map(|p| {
                    let kind = if p.is_system() { "system" } else { "custom" };
                    ListItem::new(Line::from(vec![
                        Span::styled(format!(" {} ", p.icon()), Style::default().fg(Color::Cyan)),
                        Span::raw(p.name.as_str()),
                        Span::styled(format!("  {}", kind), Style::default().fg(Color::DarkGray)),
                    ]))
                })
                .collect();
            let list = List::new(rows)
                .block(block)
                .highlight_style(
                    Style::default()
                        .bg(Color::DarkGray)
                        .fg(Color::White)
                        .add_modifier(Modifier::BOLD),
                )
                .highlight_symbol("▸ ");
            let mut state = ListState::default();
            state.select(Some(app.playlists.selected));
            frame.render_stateful_widget(list, chunks[0], &mut state);
        }
        other => {
            let (text, color) = match other {
                Loadable::Loading => ("Loading...".to_string(), Color::Yellow),
                Loadable::Failed(reason) => (format!("Request failed: {}", reason), Color::Red),
                Loadable::Loaded { .. } => ("No playlists yet. Press n to create one".to_string(), Color::DarkGray),
                Loadable::Idle => (String::new(), Color::DarkGray),
            };
            let widget = Paragraph::new(text)
                .style(Style::default().fg(color))
                .alignment(Alignment::Center)
                .block(block);
            frame.render_widget(widget, chunks[0]);
        }
    }

    // ── New playlist bar ──
    let editing = app.input_mode == InputMode::Editing;
    let style = if editing {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let label = if editing { " Name: " } else { " n: new playlist" };
    let text = if editing {
        format!("{}{}", label, app.playlists.new_name)
    } else {
        label.to_string()
    };
    let bar = Paragraph::new(text).style(style).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(style)
            .title(" Create "),
    );
    frame.render_widget(bar, chunks[1]);

    if editing {
        let cursor_x = chunks[1].x + 1 + label.len() as u16 + app.playlists.new_name.chars().count() as u16;
        frame.set_cursor_position((cursor_x, chunks[1].y + 1));
    }
}
