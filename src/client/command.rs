//! Sender input interpretation
//!
//! Turns a line typed by a sender into the request to send: `/join <room>`,
//! `/leave` and `/quit` are commands, any other line is broadcast text.

use crate::protocol::constants::MAX_LEN;
use crate::protocol::{Message, Tag};

/// A parsed sender input line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Join(String),
    Leave,
    Quit,
    SendAll(String),
}

/// Why an input line was refused
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("Empty line")]
    Empty,

    #[error("Invalid room")]
    MissingRoom,

    #[error("Invalid command: {0}")]
    Unknown(String),

    #[error("Message exceeds max length of {}", MAX_LEN)]
    TooLong,
}

impl Command {
    /// Interpret one input line
    pub fn parse(line: &str) -> Result<Self, CommandError> {
        let line = line.trim_end_matches(['\r', '\n']);
        if line.is_empty() {
            return Err(CommandError::Empty);
        }

        let mut words = line.split_whitespace();
        let first = words.next().unwrap_or("");

        // A lone "/" is ordinary text
        if first.len() > 1 && first.starts_with('/') {
            return match first {
                "/join" => words
                    .next()
                    .map(|room| Command::Join(room.to_string()))
                    .ok_or(CommandError::MissingRoom),
                "/leave" => Ok(Command::Leave),
                "/quit" => Ok(Command::Quit),
                other => Err(CommandError::Unknown(other.to_string())),
            };
        }

        if line.len() > MAX_LEN {
            return Err(CommandError::TooLong);
        }
        Ok(Command::SendAll(line.to_string()))
    }

    /// The request message for this command
    pub fn to_message(&self) -> Message {
        match self {
            Command::Join(room) => Message::new(Tag::Join, room.as_str()),
            Command::Leave => Message::new(Tag::Leave, ""),
            Command::Quit => Message::new(Tag::Quit, "bye"),
            Command::SendAll(text) => Message::new(Tag::SendAll, text.as_str()),
        }
    }
}
