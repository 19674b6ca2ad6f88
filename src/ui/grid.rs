use crate::app::{App, CELL_WIDTH, InputMode, Loadable, MovieGrid};
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};

use super::{score, truncate_str};

const CELL_HEIGHT: u16 = 4;

/// First row to draw so that the selected row stays visible.
fn first_row(selected_row: usize, visible_rows: usize) -> usize {
    selected_row.saturating_sub(visible_rows.saturating_sub(1))
}

pub fn render(frame: &mut Frame, area: Rect, grid: &MovieGrid, title: &str, columns: usize) {
    let mut block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(title.to_string());
    if let Loadable::Loaded { items, at } = &grid.state {
        block = block.title_bottom(
            Line::from(format!(" {} movies · {} ", items.len(), at.format("%H:%M")))
                .alignment(Alignment::Right),
        );
    }
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let message = match &grid.state {
        Loadable::Idle => Some(("Nothing requested yet".to_string(), Color::DarkGray)),
        Loadable::Loading => Some(("Loading...".to_string(), Color::Yellow)),
        Loadable::Failed(reason) => Some((format!("Request failed: {}", reason), Color::Red)),
        Loadable::Loaded { items, .. } if items.is_empty() => {
            Some(("No movies here yet".to_string(), Color::DarkGray))
        }
        Loadable::Loaded { .. } => None,
    };
    if let Some((text, color)) = message {
        let widget = Paragraph::new(text)
            .style(Style::default().fg(color))
            .alignment(Alignment::Center);
        frame.render_widget(widget, inner);
        return;
    }

    let items = grid.state.items();
    let columns = columns.max(1);
    let visible_rows = (inner.height / CELL_HEIGHT).max(1) as usize;
    let start = first_row(grid.selected / columns, visible_rows) * columns;

    for (slot, movie) in items.iter().enumerate().skip(start).take(visible_rows * columns) {
        let rel = slot - start;
        let cell = Rect {
            x: inner.x + (rel % columns) as u16 * CELL_WIDTH,
            y: inner.y + (rel / columns) as u16 * CELL_HEIGHT,
            width: CELL_WIDTH,
            height: CELL_HEIGHT,
        }
        .intersection(inner);

        let selected = slot == grid.selected;
        let border = if selected {
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        let width = CELL_WIDTH.saturating_sub(2) as usize;
        let title_style = if selected {
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::White)
        };
        let lines = vec![
            Line::from(Span::styled(truncate_str(&movie.title, width), title_style)),
            Line::from(Span::styled(score(movie.rating), Style::default().fg(Color::Yellow))),
        ];
        let widget = Paragraph::new(lines).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(border),
        );
        frame.render_widget(widget, cell);
    }
}

pub fn render_search(app: &App, frame: &mut Frame, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(3)])
        .split(area);

    // ── Query bar ──
    let editing = app.input_mode == InputMode::Editing;
    let style = if editing {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let label = if editing {
        " Query (Enter to search, Esc to cancel): "
    } else {
        " Query (/): "
    };
    let bar = Paragraph::new(format!("{}{}", label, app.search.query))
        .style(style)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(style)
                .title(" Search "),
        );
    frame.render_widget(bar, chunks[0]);

    if editing {
        let cursor_x = chunks[0].x + 1 + label.chars().count() as u16 + app.search.query.chars().count() as u16;
        frame.set_cursor_position((cursor_x, chunks[0].y + 1));
    }

    let title = match &app.search.submitted {
        Some(query) => format!(" Results for \"{}\" ", truncate_str(query, 30)),
        None => " Results ".to_string(),
    };
    render(frame, chunks[1], &app.search.grid, &title, app.grid_columns);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_row_scrolls_with_selection() {
        assert_eq!(first_row(0, 3), 0);
        assert_eq!(first_row(2, 3), 0);
        assert_eq!(first_row(3, 3), 1);
        assert_eq!(first_row(7, 1), 7);
    }
}
