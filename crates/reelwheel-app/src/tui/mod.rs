// TUI: layout, input handling, and widget rendering.
//
// The TUI owns a `ViewState` that mirrors what the app orchestrator reports.
// The orchestrator pushes `UiUpdate` messages over an mpsc channel; the TUI
// applies them to `ViewState` and re-renders at ~30 fps. Typed commands go
// back over a `UserCommand` channel.

pub mod input;
pub mod layout;
pub mod widgets;

use std::collections::VecDeque;
use std::time::Duration;

use crossterm::event::{Event, EventStream};
use futures_util::StreamExt;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;
use tokio::sync::mpsc;

use reelwheel_core::{Item, ListKind, ListView, OwnerId, WheelView};

use crate::app::UiUpdate;
use crate::command::UserCommand;
use layout::{build_layout, AppLayout};

/// Messages kept for the message panel.
pub const MAX_MESSAGES: usize = 200;

// ---------------------------------------------------------------------------
// ViewState
// ---------------------------------------------------------------------------

/// One line in the message panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub text: String,
    pub is_error: bool,
}

/// TUI-local state that mirrors the application state for rendering.
#[derive(Debug, Default)]
pub struct ViewState {
    pub owner: Option<OwnerId>,
    pub wheel: ListView,
    pub wheel_capacity: Option<usize>,
    pub watched: ListView,
    /// Rotation, spinning flag and current winner.
    pub turn: WheelView,
    pub last_winner: Option<Item>,
    /// Oldest first, capped at [`MAX_MESSAGES`].
    pub messages: VecDeque<Message>,
    /// Text typed into the command line.
    pub input: String,
    /// First visible row of the watched list.
    pub watched_scroll: usize,
}

impl ViewState {
    pub fn push_message(&mut self, text: impl Into<String>, is_error: bool) {
        for line in text.into().lines() {
            if self.messages.len() == MAX_MESSAGES {
                self.messages.pop_front();
            }
            self.messages.push_back(Message {
                text: line.to_string(),
                is_error,
            });
        }
    }
}

// ---------------------------------------------------------------------------
// UiUpdate processing
// ---------------------------------------------------------------------------

/// Apply a single UiUpdate to the ViewState.
fn apply_ui_update(state: &mut ViewState, update: UiUpdate) {
    match update {
        UiUpdate::Info(text) => state.push_message(text, false),
        UiUpdate::Error(text) => state.push_message(text, true),
        UiUpdate::OwnerSelected(owner) => {
            state.owner = Some(owner);
            state.last_winner = None;
            state.watched_scroll = 0;
        }
        UiUpdate::ListChanged {
            kind,
            view,
            capacity,
        } => match kind {
            ListKind::Wheel => {
                state.wheel = view;
                state.wheel_capacity = capacity;
            }
            ListKind::Consumed => state.watched = view,
        },
        UiUpdate::WheelTurned(turn) => state.turn = turn,
        UiUpdate::SpinStarted { entries } => {
            state.last_winner = None;
            state.push_message(format!("Spinning across {entries} entries..."), false);
        }
        UiUpdate::Winner(item) => {
            state.push_message(
                format!("Tonight's pick: {} (type `watched` once you've seen it)", item.title),
                false,
            );
            state.last_winner = Some(item);
        }
    }
}

// ---------------------------------------------------------------------------
// Render frame
// ---------------------------------------------------------------------------

/// Render the complete frame.
fn render_frame(frame: &mut Frame, state: &ViewState) {
    let layout = build_layout(frame.area());

    widgets::status_bar::render(frame, layout.status_bar, state);
    widgets::wheel::render(frame, layout.wheel, state);
    widgets::watched::render(frame, layout.watched, state);
    widgets::messages::render(frame, layout.messages, state);
    widgets::command_line::render(frame, layout.command_line, state);
    render_help_bar(frame, &layout);
}

fn render_help_bar(frame: &mut Frame, layout: &AppLayout) {
    let text = " Enter:Run | Esc:Clear | PgUp/PgDn:Scroll watched | help:Commands | Ctrl+C:Quit";
    let paragraph = Paragraph::new(Line::from(vec![Span::styled(
        text,
        Style::default().fg(Color::White).add_modifier(Modifier::DIM),
    )]))
    .style(Style::default().bg(Color::DarkGray));
    frame.render_widget(paragraph, layout.help_bar);
}

// ---------------------------------------------------------------------------
// Main TUI loop
// ---------------------------------------------------------------------------

/// Run the TUI event loop.
///
/// 1. Initializes the terminal (raw mode, alternate screen).
/// 2. Installs a panic hook to restore the terminal on crash.
/// 3. Runs an async select loop: UI updates, keyboard input, render ticks.
/// 4. Restores the terminal on exit.
pub async fn run(
    mut ui_rx: mpsc::Receiver<UiUpdate>,
    cmd_tx: mpsc::Sender<UserCommand>,
) -> anyhow::Result<()> {
    // 1. Initialize terminal
    let mut terminal = ratatui::init();

    // 2. Restore the terminal before the original panic hook prints.
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        ratatui::restore();
        original_hook(panic_info);
    }));

    let mut view_state = ViewState::default();
    let mut event_stream = EventStream::new();
    let mut render_tick = tokio::time::interval(Duration::from_millis(33));
    render_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    // 3. Main loop
    let result = loop {
        tokio::select! {
            update = ui_rx.recv() => {
                match update {
                    Some(ui_update) => apply_ui_update(&mut view_state, ui_update),
                    // Channel closed: app is shutting down
                    None => break Ok(()),
                }
            }

            maybe_event = event_stream.next() => {
                match maybe_event {
                    Some(Ok(Event::Key(key_event))) => {
                        if let Some(cmd) = input::handle_key(key_event, &mut view_state) {
                            let quit = cmd == UserCommand::Quit;
                            if cmd_tx.send(cmd).await.is_err() || quit {
                                break Ok(());
                            }
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => break Err(anyhow::Error::new(e).context("terminal input failed")),
                    None => break Ok(()),
                }
            }

            _ = render_tick.tick() => {
                if let Err(e) = terminal.draw(|frame| render_frame(frame, &view_state)) {
                    break Err(anyhow::Error::new(e).context("failed to draw frame"));
                }
            }
        }
    };

    // 4. Restore terminal
    ratatui::restore();
    result
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
