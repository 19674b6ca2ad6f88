use crate::app::{App, View};
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Tabs},
};

pub fn render(app: &App, frame: &mut Frame, area: Rect) {
    let user_label = match &app.user {
        Some(user) => format!(" ● {} ", user.username),
        None => " ○ signed out ".to_string(),
    };

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Min(10),
            Constraint::Length(user_label.chars().count() as u16 + 2),
        ])
        .split(area);

    let titles: Vec<Line> = View::ALL
        .iter()
        .map(|v| Line::from(format!(" {} ", v.label())))
        .collect();
    let selected = View::ALL.iter().position(|v| *v == app.view).unwrap_or(0);

    let tabs = Tabs::new(titles)
        .select(selected)
        .style(Style::default().fg(Color::DarkGray))
        .highlight_style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
        )
        .block(
            Block::default()
                .borders(Borders::BOTTOM)
                .border_style(Style::default().fg(Color::DarkGray))
                .title(Span::styled(
                    " WeChoose ",
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                )),
        );
    frame.render_widget(tabs, chunks[0]);

    let user_style = if app.is_signed_in() {
        Style::default().fg(Color::Green)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let user = Paragraph::new(Line::from(Span::styled(user_label, user_style))).block(
        Block::default()
            .borders(Borders::BOTTOM)
            .border_style(Style::default().fg(Color::DarkGray)),
    );
    frame.render_widget(user, chunks[1]);
}
