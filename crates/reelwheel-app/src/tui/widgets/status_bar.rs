// Status bar widget: owner, list counts, busy indicator.

use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use reelwheel_core::OperationFlags;

use crate::tui::ViewState;

/// Render the status bar into the given area.
///
/// Layout: [owner] | [wheel count] | [watched count] | [activity]
pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let owner = match &state.owner {
        Some(owner) => Span::styled(
            format!(" {owner} "),
            Style::default().fg(Color::Black).bg(Color::White).add_modifier(Modifier::BOLD),
        ),
        None => Span::styled(" no owner ", Style::default().fg(Color::Yellow)),
    };
    let separator = || Span::styled(" | ", Style::default().fg(Color::Gray));

    let mut spans = vec![
        owner,
        separator(),
        Span::styled(
            format!("Wheel {}", count_label(state.wheel.items.len(), state.wheel_capacity)),
            Style::default().fg(Color::White),
        ),
        separator(),
        Span::styled(
            format!("Watched {}", state.watched.items.len()),
            Style::default().fg(Color::White),
        ),
    ];

    let (label, color) = activity(state);
    spans.push(separator());
    spans.push(Span::styled(label, Style::default().fg(color)));

    let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));
    frame.render_widget(paragraph, area);
}

/// "n/max" for a bounded list, plain "n" otherwise.
pub fn count_label(len: usize, capacity: Option<usize>) -> String {
    match capacity {
        Some(max) => format!("{len}/{max}"),
        None => len.to_string(),
    }
}

/// What the wheel is busy with, most specific first. `None` when idle.
pub fn busy_label(flags: &OperationFlags) -> Option<&'static str> {
    if flags.loading_list {
        Some("loading")
    } else if flags.resolving_title {
        Some("looking up")
    } else if flags.removing_item {
        Some("removing")
    } else if flags.saving_list {
        Some("saving")
    } else {
        None
    }
}

/// Activity text and color across the spin and both lists.
fn activity(state: &ViewState) -> (&'static str, Color) {
    if state.turn.is_spinning {
        return ("spinning", Color::Magenta);
    }
    busy_label(&state.wheel.flags)
        .or_else(|| busy_label(&state.watched.flags))
        .map_or(("ready", Color::Green), |label| (label, Color::Yellow))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
