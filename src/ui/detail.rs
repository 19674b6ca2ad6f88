use crate::api::MovieDetail;
use crate::detail::{DetailController, ModalState};
use ratatui::{
    Frame,
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
};

use super::{centered_rect, score, truncate_str};

pub fn render(modal: &DetailController, can_like: bool, frame: &mut Frame, area: Rect) {
    let area = centered_rect(70, 85, area);
    frame.render_widget(Clear, area);

    match modal.state() {
        ModalState::Closed => {}
        ModalState::Loading { movie_id } => {
            let loading = Paragraph::new(format!("Loading movie {}...", movie_id))
                .style(Style::default().fg(Color::Yellow))
                .alignment(Alignment::Center)
                .block(frame_block(" Movie ".to_string()));
            frame.render_widget(loading, area);
        }
        ModalState::Detail(detail) => render_detail(detail, modal.scroll, can_like, frame, area),
        ModalState::Selecting {
            detail,
            targets,
            loaded,
            cursor,
        } => {
            let block = frame_block(format!(" Add \"{}\" to... ", truncate_str(&detail.title, 30)))
                .title_bottom(
                    Line::from(" ↑↓ choose · Enter add · Esc back ")
                        .style(Style::default().fg(Color::DarkGray)),
                );
            if !loaded || targets.is_empty() {
                let (text, color) = if !loaded {
                    ("Loading playlists...", Color::Yellow)
                } else {
                    ("No custom playlists yet. Create one on the Playlists screen", Color::DarkGray)
                };
                let widget = Paragraph::new(text)
                    .style(Style::default().fg(color))
                    .alignment(Alignment::Center)
                    .wrap(Wrap { trim: true })
                    .block(block);
                frame.render_widget(widget, area);
                return;
            }
            let rows: Vec<ListItem> = targets
                .iter()
                .map(|p| ListItem::new(format!(" {} {}", p.icon(), p.name)))
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
            state.select(Some(*cursor));
            frame.render_stateful_widget(list, area, &mut state);
        }
    }
}

fn frame_block(title: String) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(title)
}

fn render_detail(detail: &MovieDetail, scroll: u16, can_like: bool, frame: &mut Frame, area: Rect) {
    let label = Style::default().fg(Color::DarkGray);
    let mut lines = vec![
        Line::from(Span::styled(
            detail.title.as_str(),
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        )),
        Line::from(vec![
            Span::styled(score(detail.rating), Style::default().fg(Color::Yellow)),
            Span::raw("   "),
            Span::styled("Released: ", label),
            Span::raw(detail.release_date.as_deref().unwrap_or("unknown")),
        ]),
    ];
    if let Some(trailer) = &detail.trailer_url {
        lines.push(Line::from(vec![
            Span::styled("Trailer: ", label),
            Span::styled(
                trailer.as_str(),
                Style::default().fg(Color::Blue).add_modifier(Modifier::UNDERLINED),
            ),
        ]));
    }
    if !detail.poster_url.is_empty() {
        lines.push(Line::from(vec![
            Span::styled("Poster: ", label),
            Span::styled(detail.poster_url.as_str(), label),
        ]));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(
        detail
            .overview
            .as_deref()
            .unwrap_or("No overview available."),
    ));

    if !detail.cast.is_empty() {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "Cast",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        )));
        for member in &detail.cast {
            let mut spans = vec![Span::raw(format!("  {}", member.name))];
            if let Some(character) = &member.character {
                spans.push(Span::styled(format!(" as {}", character), label));
            }
            lines.push(Line::from(spans));
        }
    }

    let footer = if can_like {
        " a add to playlist · l like · o trailer · Esc close "
    } else {
        " a add to playlist · o trailer · Esc close "
    };
    let widget = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .scroll((scroll, 0))
        .block(
            frame_block(" Movie ".to_string()).title_bottom(
                Line::from(footer)
                    .style(Style::default().fg(Color::DarkGray))
                    .alignment(Alignment::Right),
            ),
        );
    frame.render_widget(widget, area);
}
