// Terminal front end for the movie wheel: command parsing, the app
// orchestrator, and the ratatui TUI.

pub mod app;
pub mod command;
pub mod tui;
