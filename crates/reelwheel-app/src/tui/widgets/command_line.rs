// Command line widget: the text being typed, with the terminal cursor at
// its end.

use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

use crate::tui::ViewState;

const PROMPT: &str = "> ";

pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let line = Line::from(vec![
        Span::styled(PROMPT, Style::default().fg(Color::Cyan)),
        Span::raw(state.input.clone()),
    ]);
    let paragraph = Paragraph::new(line).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan))
            .title("Command"),
    );
    frame.render_widget(paragraph, area);

    if area.width > 2 && area.height > 2 {
        frame.set_cursor_position(cursor_position(area, &state.input));
    }
}

/// Cursor just after the typed text, kept inside the border.
pub fn cursor_position(area: Rect, input: &str) -> (u16, u16) {
    let typed = (PROMPT.chars().count() + input.chars().count()) as u16;
    let max_x = area.x + area.width.saturating_sub(2);
    ((area.x + 1 + typed).min(max_x), area.y + 1)
}
