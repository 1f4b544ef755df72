// Watched list widget: titles already seen, sorted by title, scrollable.

use ratatui::layout::{Margin, Rect};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{
    Block, Borders, List, ListItem, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState,
};
use ratatui::Frame;

use crate::tui::ViewState;

/// Render the watched list into the given area.
pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let items = &state.watched.items;
    let title = format!("Watched ({})", items.len());

    if items.is_empty() {
        let paragraph = Paragraph::new("  Nothing watched yet.")
            .style(Style::default().fg(Color::DarkGray))
            .block(Block::default().borders(Borders::ALL).title(title));
        frame.render_widget(paragraph, area);
        return;
    }

    // Visible row count: subtract 2 for borders
    let visible_rows = (area.height as usize).saturating_sub(2);
    let offset = clamp_offset(state.watched_scroll, items.len(), visible_rows);

    let rows: Vec<ListItem> = items
        .iter()
        .enumerate()
        .skip(offset)
        .take(visible_rows.max(1))
        .map(|(i, item)| {
            ListItem::new(Line::from(vec![
                Span::styled(format!("{:>3}. ", i + 1), Style::default().fg(Color::DarkGray)),
                Span::raw(item.title.clone()),
            ]))
        })
        .collect();

    let list = List::new(rows).block(Block::default().borders(Borders::ALL).title(title));
    frame.render_widget(list, area);

    if items.len() > visible_rows {
        let mut scrollbar_state =
            ScrollbarState::new(items.len().saturating_sub(visible_rows)).position(offset);
        frame.render_stateful_widget(
            Scrollbar::new(ScrollbarOrientation::VerticalRight),
            area.inner(Margin {
                vertical: 1,
                horizontal: 0,
            }),
            &mut scrollbar_state,
        );
    }
}

/// Keep the last page full: never scroll past the point where the final
/// entry sits on the bottom row.
pub fn clamp_offset(offset: usize, total: usize, visible_rows: usize) -> usize {
    offset.min(total.saturating_sub(visible_rows))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
