// Keyboard input handling.
//
// Keys edit the command line; Enter parses it into a `UserCommand` for the
// app orchestrator. Page keys scroll the watched list locally.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use super::ViewState;
use crate::command::{parse_command, UserCommand};

/// Rows moved by PageUp/PageDown.
const PAGE_ROWS: usize = 5;

/// Handle a keyboard event.
///
/// Returns `Some(UserCommand)` when a typed command was submitted. Everything
/// else is handled by mutating `ViewState`; a line that does not parse is
/// reported in the message panel and left in place for correction.
pub fn handle_key(key_event: KeyEvent, view_state: &mut ViewState) -> Option<UserCommand> {
    // Ignore release/repeat events (crossterm reports both on Windows).
    if key_event.kind != KeyEventKind::Press {
        return None;
    }

    if key_event.modifiers.contains(KeyModifiers::CONTROL) {
        return match key_event.code {
            KeyCode::Char('c') => Some(UserCommand::Quit),
            KeyCode::Char('u') => {
                view_state.input.clear();
                None
            }
            _ => None,
        };
    }

    match key_event.code {
        KeyCode::Enter => submit(view_state),
        KeyCode::Esc => {
            view_state.input.clear();
            None
        }
        KeyCode::Backspace => {
            view_state.input.pop();
            None
        }
        KeyCode::Char(c) => {
            view_state.input.push(c);
            None
        }
        KeyCode::Up => {
            scroll_watched_up(view_state, 1);
            None
        }
        KeyCode::Down => {
            scroll_watched_down(view_state, 1);
            None
        }
        KeyCode::PageUp => {
            scroll_watched_up(view_state, PAGE_ROWS);
            None
        }
        KeyCode::PageDown => {
            scroll_watched_down(view_state, PAGE_ROWS);
            None
        }
        _ => None,
    }
}

fn submit(view_state: &mut ViewState) -> Option<UserCommand> {
    match parse_command(&view_state.input) {
        Ok(cmd) => {
            view_state.input.clear();
            cmd
        }
        Err(message) => {
            view_state.push_message(message, true);
            None
        }
    }
}

fn scroll_watched_up(view_state: &mut ViewState, rows: usize) {
    view_state.watched_scroll = view_state.watched_scroll.saturating_sub(rows);
}

/// Scrolling stops at the last entry; the widget clamps further to the
/// visible height.
fn scroll_watched_down(view_state: &mut ViewState, rows: usize) {
    let last = view_state.watched.items.len().saturating_sub(1);
    view_state.watched_scroll = (view_state.watched_scroll + rows).min(last);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
