//! Console commands read from stdin while the dashboard is running.

use spirewatch_core::{Category, UnknownCategory};
use thiserror::Error;

pub const HELP: &str = "\
commands:
  refresh [registrations|agents|server|all]   fetch now (default: all)
  interval <secs>                             change the refresh interval
  contexts <server> <workload>                change the cluster contexts
  help                                        show this text
  quit                                        stop and exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    /// `None` refreshes every category.
    Refresh(Option<Category>),
    /// Raw interval text; parsed leniently when applied.
    Interval(String),
    Contexts { server: String, workload: String },
    Help,
    Quit,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConsoleError {
    #[error("unknown command: {0:?} (try \"help\")")]
    Unknown(String),

    #[error("{command} needs {argument}")]
    MissingArgument {
        command: &'static str,
        argument: &'static str,
    },

    #[error(transparent)]
    Category(#[from] UnknownCategory),
}

/// Parse one input line. Blank lines yield `None`.
pub fn parse(line: &str) -> Result<Option<ConsoleCommand>, ConsoleError> {
    let mut words = line.split_whitespace();
    let Some(command) = words.next() else {
        return Ok(None);
    };

    let parsed = match command.to_ascii_lowercase().as_str() {
        "refresh" | "r" => match words.next() {
            None | Some("all") => ConsoleCommand::Refresh(None),
            Some(name) => ConsoleCommand::Refresh(Some(name.parse()?)),
        },
        "interval" | "i" => {
            let secs = words.next().ok_or(ConsoleError::MissingArgument {
                command: "interval",
                argument: "a number of seconds",
            })?;
            ConsoleCommand::Interval(secs.to_string())
        }
        "contexts" | "ctx" => match (words.next(), words.next()) {
            (Some(server), Some(workload)) => ConsoleCommand::Contexts {
                server: server.to_string(),
                workload: workload.to_string(),
            },
            _ => {
                return Err(ConsoleError::MissingArgument {
                    command: "contexts",
                    argument: "a server and a workload context",
                });
            }
        },
        "help" | "?" => ConsoleCommand::Help,
        "quit" | "exit" | "q" => ConsoleCommand::Quit,
        other => return Err(ConsoleError::Unknown(other.to_string())),
    };
    Ok(Some(parsed))
}
