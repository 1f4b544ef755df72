// Message panel: the most recent info and error lines, newest at the bottom.

use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

use crate::tui::{Message, ViewState};

pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let visible_rows = (area.height as usize).saturating_sub(2);
    let lines: Vec<Line> = tail(&state.messages, visible_rows)
        .map(message_line)
        .collect();

    let paragraph = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Messages"));
    frame.render_widget(paragraph, area);
}

/// The last `rows` messages, oldest first.
pub fn tail<'a>(
    messages: &'a std::collections::VecDeque<Message>,
    rows: usize,
) -> impl Iterator<Item = &'a Message> {
    messages.iter().skip(messages.len().saturating_sub(rows))
}

fn message_line(message: &Message) -> Line<'static> {
    if message.is_error {
        Line::from(Span::styled(
            format!("! {}", message.text),
            Style::default().fg(Color::Red),
        ))
    } else {
        Line::from(Span::raw(format!("  {}", message.text)))
    }
}
