// Commands typed into the input line.

/// A command typed at the prompt. Positions are 1-based, as numbered on
/// screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserCommand {
    /// Select the owner whose lists are shown and edited.
    Owner(String),
    Add(String),
    Remove(usize),
    Clear,
    Spin,
    /// Interrupt a running spin.
    Stop,
    /// Move the last winner from the wheel to the watched list.
    Watched,
    Unwatch(usize),
    Help,
    Quit,
}

pub const HELP: &str = "\
commands:
  owner <name>      load <name>'s wheel and watched list
  add <title>       look a movie up and put it on the wheel
  remove <n>        take entry n off the wheel
  clear             empty the wheel
  spin              spin the wheel
  stop              stop a spin in progress
  watched           move the last winner to the watched list
  unwatch <n>       take entry n off the watched list
  help              show this help
  quit              exit";

/// Parse one input line. Blank lines yield `Ok(None)`.
pub fn parse_command(line: &str) -> Result<Option<UserCommand>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let cmd = match word.to_ascii_lowercase().as_str() {
        "owner" | "user" => UserCommand::Owner(required(rest, "owner <name>")?),
        "add" => UserCommand::Add(required(rest, "add <title>")?),
        "remove" | "rm" => UserCommand::Remove(position(rest, "remove <n>")?),
        "clear" => UserCommand::Clear,
        "spin" => UserCommand::Spin,
        "stop" => UserCommand::Stop,
        "watched" => UserCommand::Watched,
        "unwatch" => UserCommand::Unwatch(position(rest, "unwatch <n>")?),
        "help" | "?" => UserCommand::Help,
        "quit" | "exit" | "q" => UserCommand::Quit,
        other => return Err(format!("unknown command `{other}`; try `help`")),
    };
    Ok(Some(cmd))
}

fn required(arg: &str, usage: &str) -> Result<String, String> {
    if arg.is_empty() {
        Err(format!("usage: {usage}"))
    } else {
        Ok(arg.to_string())
    }
}

fn position(arg: &str, usage: &str) -> Result<usize, String> {
    match arg.parse::<usize>() {
        Ok(n) if n >= 1 => Ok(n),
        _ => Err(format!("usage: {usage} (n is the number shown by the list)")),
    }
}
