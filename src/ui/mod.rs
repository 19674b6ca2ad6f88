pub mod account;
mod detail;
mod grid;
mod help;
mod home;
mod navbar;
mod playlists;

pub use home::card_area;

use crate::app::{App, InputMode, View};
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Splits the terminal into navbar, body and status bar.
pub fn layout(area: Rect) -> (Rect, Rect, Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(5),
            Constraint::Length(1),
        ])
        .split(area);
    (chunks[0], chunks[1], chunks[2])
}

/// Top-level render dispatch.
pub fn render(app: &App, frame: &mut Frame) {
    let (nav, body, status) = layout(frame.area());

    navbar::render(app, frame, nav);
    match app.view {
        View::Home => home::render(app, frame, body),
        View::News => grid::render(frame, body, &app.news.grid, " Now playing ", app.grid_columns),
        View::Search => grid::render_search(app, frame, body),
        View::Playlists => playlists::render(app, frame, body),
        View::Account => account::render(app, frame, body),
    }
    render_status(app, frame, status);

    if let Some(modal) = app.modal().filter(|m| m.is_open()) {
        detail::render(modal, app.view == View::Search, frame, body);
    }

    // Render help overlay on top if active
    if app.show_help {
        help::render(frame);
    }
}

fn hint<'a>(key: &'a str, label: &'a str) -> [Span<'a>; 2] {
    [
        Span::styled(
            key,
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(label),
    ]
}

fn render_status(app: &App, frame: &mut Frame, area: Rect) {
    let hints: &[(&str, &str)] = if app.modal_open() {
        &[(" ↑↓", " Move  "), ("a", " Add to list  "), ("Esc", " Back  ")]
    } else if app.input_mode == InputMode::Editing {
        &[(" Enter", " Submit  "), ("Esc", " Cancel  ")]
    } else {
        match app.view {
            View::Home => &[
                (" ←/x", " Skip  "),
                ("→/w", " Watch later  "),
                ("1-5", " Rate  "),
                ("Enter", " Detail  "),
            ],
            View::News => &[(" ↑↓←→", " Move  "), ("Enter", " Detail  "), ("r", " Reload  ")],
            View::Search => &[(" /", " Query  "), ("Enter", " Detail  ")],
            View::Playlists => &[(" Enter", " Open  "), ("n", " New  "), ("Esc", " Back  ")],
            View::Account => &[(" e", " Edit  "), ("s", " Switch mode  "), ("L", " Log out  ")],
        }
    };

    let mut spans: Vec<Span> = hints.iter().flat_map(|&(k, l)| hint(k, l)).collect();
    spans.extend(hint("Tab", " Views  "));
    spans.extend(hint("?", " Help  "));
    spans.extend(hint("q", " Quit  "));
    spans.push(Span::styled(
        app.status_msg.as_str(),
        Style::default().fg(Color::DarkGray),
    ));
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// Formats a 0-10 score.
pub fn score(rating: f64) -> String {
    format!("★ {:.1}", rating)
}

/// Truncate a string to `max_width` display columns, adding "…" if truncated.
pub fn truncate_str(s: &str, max_width: usize) -> String {
    if s.width() <= max_width {
        return s.to_string();
    }
    if max_width == 0 {
        return String::new();
    }
    let mut result = String::new();
    let mut used = 0;
    for c in s.chars() {
        let w = c.width().unwrap_or(0);
        if used + w + 1 > max_width {
            break;
        }
        result.push(c);
        used += w;
    }
    result.push('…');
    result
}

/// Create a centered rectangle using percentage of parent area.
pub fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1]);

    horizontal[1]
}
