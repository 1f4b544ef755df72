// Wheel widget: numbered entries with a pointer that tracks the rotation.
//
// Entries are listed in wheel order. While the wheel turns, the marker walks
// through the entry currently under the pointer; once it settles the winner
// is shown in green with its poster and description below the list.

use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use ratatui::Frame;

use reelwheel_core::spin::index_under_pointer;
use reelwheel_core::Item;

use crate::tui::widgets::status_bar::count_label;
use crate::tui::ViewState;

const POINTER: &str = "▶";

/// Render the wheel panel into the given area.
pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let title = format!(
        "Wheel {} - {:.0}°",
        count_label(state.wheel.items.len(), state.wheel_capacity),
        state.turn.rotation
    );
    let border = if state.turn.is_spinning {
        Style::default().fg(Color::Magenta)
    } else {
        Style::default()
    };

    let mut lines = entry_lines(state);
    if let Some(winner) = &state.last_winner {
        lines.push(Line::raw(""));
        lines.extend(winner_lines(winner));
    }

    let paragraph = Paragraph::new(lines).wrap(Wrap { trim: false }).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(border)
            .title(title),
    );
    frame.render_widget(paragraph, area);
}

/// Row of the entry under the pointer, if the wheel has entries.
pub fn pointer_row(state: &ViewState) -> Option<usize> {
    index_under_pointer(state.turn.rotation, state.wheel.items.len())
}

/// One line per entry, with the pointer marker on the entry under it.
pub fn entry_lines(state: &ViewState) -> Vec<Line<'static>> {
    let items = &state.wheel.items;
    if items.is_empty() {
        return vec![Line::from(Span::styled(
            "  The wheel is empty. Type `add <title>`.",
            Style::default().fg(Color::DarkGray),
        ))];
    }

    let pointed = pointer_row(state);
    let settled_winner = state
        .turn
        .current_winner
        .as_ref()
        .filter(|_| !state.turn.is_spinning);

    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let under_pointer = pointed == Some(i);
            let is_winner = settled_winner.is_some_and(|w| w.id == item.id);
            let style = if is_winner {
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
            } else if under_pointer && state.turn.is_spinning {
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::White)
            };
            let marker = if under_pointer { POINTER } else { " " };
            Line::from(Span::styled(
                format!("{marker} {:>2}. {}", i + 1, item.title),
                style,
            ))
        })
        .collect()
}

fn winner_lines(winner: &Item) -> Vec<Line<'static>> {
    let mut lines = vec![
        Line::from(vec![
            Span::styled("Tonight's pick: ", Style::default().fg(Color::Gray)),
            Span::styled(
                winner.title.clone(),
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(Span::styled(
            format!("poster: {}", winner.poster_ref),
            Style::default().fg(Color::DarkGray),
        )),
    ];
    if let Some(description) = &winner.description {
        lines.push(Line::raw(description.clone()));
    }
    lines
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
