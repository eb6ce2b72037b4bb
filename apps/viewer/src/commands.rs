//! Commands typed at the viewer prompt.

use shared::domain::Routine;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewerCommand {
    List,
    Select { query: String },
    Clear,
    Reload,
    Offline,
    Online,
    Theme,
    Help,
    Quit,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("unknown command '{0}', type `help` for the list")]
    Unknown(String),
    #[error("`select` needs a class id or name")]
    MissingRoutine,
    #[error("no class matches '{0}'")]
    NoMatch(String),
    #[error("'{query}' matches several classes: {candidates}")]
    Ambiguous { query: String, candidates: String },
}

pub const HELP_TEXT: &str = "\
commands:
  list              show the available classes
  select <class>    show a class by id or name
  clear             clear the selection
  reload            re-read the routine fixture
  offline | online  simulate a connectivity change
  theme             toggle light/dark and remember it
  help              show this text
  quit              exit";

/// Blank lines parse to `None`.
pub fn parse_command(line: &str) -> Result<Option<ViewerCommand>, CommandError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let command = match word.to_ascii_lowercase().as_str() {
        "list" | "ls" => ViewerCommand::List,
        "select" | "s" => {
            if rest.is_empty() {
                return Err(CommandError::MissingRoutine);
            }
            ViewerCommand::Select {
                query: rest.to_string(),
            }
        }
        "clear" => ViewerCommand::Clear,
        "reload" => ViewerCommand::Reload,
        "offline" => ViewerCommand::Offline,
        "online" => ViewerCommand::Online,
        "theme" => ViewerCommand::Theme,
        "help" | "?" => ViewerCommand::Help,
        "quit" | "exit" | "q" => ViewerCommand::Quit,
        other => return Err(CommandError::Unknown(other.to_string())),
    };
    Ok(Some(command))
}

/// Exact id first, then a case-insensitive label, then a unique substring of
/// either.
pub fn resolve_routine<'a>(
    query: &str,
    routines: &'a [Routine],
) -> Result<&'a Routine, CommandError> {
    if let Some(routine) = routines.iter().find(|r| r.id.as_str() == query) {
        return Ok(routine);
    }
    if let Some(routine) = routines
        .iter()
        .find(|r| r.label().eq_ignore_ascii_case(query))
    {
        return Ok(routine);
    }

    let needle = query.to_lowercase();
    let matches: Vec<&Routine> = routines
        .iter()
        .filter(|r| {
            r.id.as_str().to_lowercase().contains(&needle)
                || r.label().to_lowercase().contains(&needle)
        })
        .collect();
    match matches.as_slice() {
        [only] => Ok(only),
        [] => Err(CommandError::NoMatch(query.to_string())),
        many => Err(CommandError::Ambiguous {
            query: query.to_string(),
            candidates: many
                .iter()
                .map(|r| r.id.as_str())
                .collect::<Vec<_>>()
                .join(", "),
        }),
    }
}
