// TUI widget modules, one per panel.

pub mod command_line;
pub mod messages;
pub mod status_bar;
pub mod watched;
pub mod wheel;
