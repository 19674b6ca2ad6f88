use crate::app::App;
use crate::feed::{SWIPE_THRESHOLD, SwipeDirection, UNITS_PER_COLUMN};
use ratatui::{
    Frame,
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, Paragraph, Wrap},
};

use super::{score, truncate_str};
use crate::api::Movie;

const CARD_WIDTH: u16 = 44;
const CARD_HEIGHT: u16 = 18;
/// Columns an exiting card travels per frame.
const EXIT_STEP: i32 = 8;

/// Resting position of the top card inside the body area. Mouse presses
/// inside it start a drag.
pub fn card_area(body: Rect) -> Rect {
    let width = CARD_WIDTH.min(body.width);
    let height = CARD_HEIGHT.min(body.height.saturating_sub(1));
    Rect {
        x: body.x + (body.width - width) / 2,
        y: body.y + 1.min(body.height),
        width,
        height,
    }
}

/// `base` moved `dx` columns, clipped to `bounds`.
fn shifted(base: Rect, dx: i32, bounds: Rect) -> Rect {
    let x = (base.x as i32 + dx).max(0) as u16;
    let moved = Rect { x, ..base };
    moved.intersection(bounds)
}

pub fn render(app: &App, frame: &mut Frame, area: Rect) {
    let feed = &app.home.feed;
    let base = card_area(area);

    let Some(top) = feed.front() else {
        let (text, style) = if app.home.pending_batches > 0 {
            ("Loading movies...".to_string(), Style::default().fg(Color::Yellow))
        } else if let Some(error) = &app.home.last_error {
            (format!("Feed unavailable: {}", error), Style::default().fg(Color::Red))
        } else {
            (
                "No more movies. Check back later.".to_string(),
                Style::default().fg(Color::DarkGray),
            )
        };
        let empty = Paragraph::new(text)
            .style(style)
            .alignment(Alignment::Center)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::DarkGray)),
            );
        frame.render_widget(empty, base);
        render_exit(app, frame, area, base);
        return;
    };

    // Counter under the stack
    let below = Rect {
        y: base.y.saturating_add(base.height),
        height: 1,
        ..base
    }
    .intersection(area);
    let counter = Paragraph::new(format!("{} in stack", feed.len()))
        .style(Style::default().fg(Color::DarkGray))
        .alignment(Alignment::Center);
    frame.render_widget(counter, below);

    let offset = feed.drag_offset();
    let (border, badge) = match SwipeDirection::from_offset(offset) {
        Some(SwipeDirection::Right) => (Color::Green, Some("WATCH LATER")),
        Some(SwipeDirection::Left) => (Color::Red, Some("SKIP")),
        None if offset != 0 => (Color::Yellow, None),
        None => (Color::Cyan, None),
    };
    let card = shifted(base, offset / UNITS_PER_COLUMN, area);
    render_card(frame, card, top, border, badge, offset);

    render_exit(app, frame, area, base);
}

fn render_exit(app: &App, frame: &mut Frame, area: Rect, base: Rect) {
    let Some(exit) = app.home.feed.exiting() else {
        return;
    };
    let travelled = (crate::feed::EXIT_FRAMES - exit.frames_left + 1) as i32 * EXIT_STEP;
    let (dx, color) = match exit.direction {
        SwipeDirection::Right => (travelled, Color::Green),
        SwipeDirection::Left => (-travelled, Color::Red),
    };
    let card = shifted(base, dx, area);
    if card.width > 2 {
        render_card(frame, card, &exit.movie, color, None, 0);
    }
}

fn render_card(
    frame: &mut Frame,
    area: Rect,
    movie: &Movie,
    border: Color,
    badge: Option<&str>,
    offset: i32,
) {
    frame.render_widget(Clear, area);
    let inner_width = area.width.saturating_sub(4) as usize;

    let mut lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            truncate_str(&movie.title, inner_width),
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(score(movie.rating), Style::default().fg(Color::Yellow))),
        Line::from(""),
    ];
    if let Some(overview) = &movie.overview {
        lines.push(Line::from(Span::raw(overview.as_str())));
        lines.push(Line::from(""));
    }
    if !movie.poster_url.is_empty() {
        lines.push(Line::from(Span::styled(
            truncate_str(&movie.poster_url, inner_width),
            Style::default().fg(Color::DarkGray),
        )));
    }

    let mut block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(border))
        .title_bottom(
            Line::from(" x ← skip · 1-5 rate · watch later → w ")
                .style(Style::default().fg(Color::DarkGray))
                .alignment(Alignment::Center),
        );
    if let Some(badge) = badge {
        block = block.title(
            Line::from(format!(" {} ", badge))
                .style(Style::default().fg(border).add_modifier(Modifier::BOLD))
                .alignment(if offset > SWIPE_THRESHOLD {
                    Alignment::Left
                } else {
                    Alignment::Right
                }),
        );
    }

    let card = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(block);
    frame.render_widget(card, area);
}
