//! Console commands.
//!
//! Defines the commands typed into the console, their descriptions, and the
//! parser turning a console line into a [`Command`].

use crate::wm::SplitDirection;

/// Specification for a single command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub name: &'static str,
    pub description: &'static str,
}

/// Full command specifications, in help order.
pub const COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        name: "quit",
        description: "End the session",
    },
    CommandSpec {
        name: "hsplit",
        description: "Split the active pane, new pane below",
    },
    CommandSpec {
        name: "vsplit",
        description: "Split the active pane, new pane on the right",
    },
    CommandSpec {
        name: "help",
        description: "List available commands, or describe [command]",
    },
    CommandSpec {
        name: "cycle",
        description: "Focus the next pane, or pane [index]",
    },
];

/// A parsed console command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Quit,
    Split(SplitDirection),
    /// List every command, or describe one
    Help(Option<&'static CommandSpec>),
    /// Cycle focus, optionally to an explicit index. Negative indices are
    /// kept as out of range.
    Cycle(Option<usize>),
}

/// Parse a console line.
///
/// Returns `Ok(None)` for a blank line and `Err(message)` for input that
/// should be answered with a message instead of run.
pub fn parse_command(input: &str) -> Result<Option<Command>, String> {
    let tokens = tokenize(input);
    let Some((name, args)) = tokens.split_first() else {
        return Ok(None);
    };

    let command = match name.as_str() {
        "quit" => Command::Quit,
        "hsplit" => Command::Split(SplitDirection::Horizontal),
        "vsplit" => Command::Split(SplitDirection::Vertical),
        "help" => match args.first() {
            None => Command::Help(None),
            Some(topic) => match find_command(topic) {
                Some(spec) => Command::Help(Some(spec)),
                None => return Err(format!("Unknown command {topic}, try: \"help\"")),
            },
        },
        "cycle" => match args.first() {
            None => Command::Cycle(None),
            Some(arg) => match arg.parse::<i64>() {
                Ok(n) => Command::Cycle(Some(usize::try_from(n).unwrap_or(usize::MAX))),
                Err(_) => return Err(format!("Invalid argument {arg} must be integer")),
            },
        },
        _ => return Err(format!("Unknown command {name}, try: \"help\"")),
    };
    Ok(Some(command))
}

pub fn find_command(name: &str) -> Option<&'static CommandSpec> {
    COMMANDS.iter().find(|spec| spec.name == name)
}

/// `help` output: the command list, or a single command's description
pub fn help_text(topic: Option<&CommandSpec>) -> String {
    match topic {
        Some(spec) => format!("{}: {}", spec.name, spec.description),
        None => {
            let names: Vec<&str> = COMMANDS.iter().map(|spec| spec.name).collect();
            format!("Available Commands: {}", names.join(", "))
        }
    }
}

pub fn split_message(sessions: usize) -> String {
    format!("Term split successfully. There are {sessions} active sessions.")
}

pub fn cycle_message(target: Option<usize>) -> String {
    match target {
        Some(index) => format!("Successfully cycled to term {index}"),
        None => "Successfully cycled".to_string(),
    }
}

/// Split on whitespace, grouping text inside single or double quotes.
fn tokenize(input: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut quote: Option<char> = None;

    for ch in input.chars() {
        match quote {
            Some(q) if ch == q => quote = None,
            Some(_) => current.push(ch),
            None if ch == '"' || ch == '\'' => {
                quote = Some(ch);
                in_token = true;
            }
            None if ch.is_whitespace() => {
                if in_token {
                    tokens.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            None => {
                current.push(ch);
                in_token = true;
            }
        }
    }
    if in_token {
        tokens.push(current);
    }
    tokens
}
