use ratatui::{
    Frame,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};

use super::centered_rect;

fn section(title: &str) -> Line<'_> {
    Line::from(Span::styled(
        format!("  {}", title),
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
    ))
}

fn key<'a>(keys: &'a str, action: &'a str) -> Line<'a> {
    Line::from(vec![
        Span::styled(format!("    {:<12}", keys), Style::default().fg(Color::Yellow)),
        Span::raw(action),
    ])
}

pub fn render(frame: &mut Frame) {
    let area = centered_rect(70, 80, frame.area());

    // Clear the area behind the popup
    frame.render_widget(Clear, area);

    let help_text = vec![
        Line::from(""),
        section("Global"),
        key("Tab/S-Tab", "Next / previous screen"),
        key("?", "Toggle this help"),
        key("q, Ctrl+C", "Quit application"),
        key("L", "Log out (when signed in)"),
        Line::from(""),
        section("Home"),
        key("←/x", "Skip (rates the movie 1★)"),
        key("→/w", "Add to Watch later"),
        key("1-5", "Rate the top card"),
        key("Enter/click", "Open the top card"),
        key("drag", "Drag the card left or right to swipe"),
        Line::from(""),
        section("News, Search, Playlists"),
        key("arrows/hjkl", "Move in the grid"),
        key("Enter", "Open movie detail"),
        key("/", "Edit the search query"),
        key("r", "Reload"),
        key("n", "New playlist"),
        key("Esc", "Back to the list of playlists"),
        Line::from(""),
        section("Movie detail"),
        key("↑/↓", "Scroll, or move in the playlist selector"),
        key("a", "Add to one of your playlists"),
        key("l", "Mark as liked (Search only)"),
        key("o", "Open the trailer in a browser"),
        key("Esc", "Back / close"),
        Line::from(""),
        section("Account"),
        key("e", "Edit the form"),
        key("s", "Switch between log in and sign up"),
        Line::from(""),
    ];

    let help = Paragraph::new(help_text)
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan))
                .title(" Help: Keybindings ")
                .title_bottom(Line::from(" Press ? or Esc to close ").style(Style::default().fg(Color::DarkGray))),
        )
        .style(Style::default().fg(Color::White));

    frame.render_widget(help, area);
}
