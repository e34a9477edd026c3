//! Inputs that drive the conversation

use crate::cowin::{QueryError, QueryKey, QueryResult};

/// Slash commands understood by the bot
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    ByDistrict,
    ByPincode,
    Cancel,
    Exit,
    About,
    Unknown(String),
}

impl Command {
    fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "start" => Command::Start,
            "bydistrict" => Command::ByDistrict,
            "bypincode" => Command::ByPincode,
            "cancel" => Command::Cancel,
            "exit" => Command::Exit,
            "about" => Command::About,
            _ => Command::Unknown(name.to_string()),
        }
    }

    pub fn is_cancel(&self) -> bool {
        matches!(self, Command::Cancel | Command::Exit)
    }
}

/// Events that trigger state transitions
#[derive(Debug, Clone)]
pub enum Event {
    // User events
    UserText {
        text: String,
    },
    UserCommand {
        command: Command,
        argument: Option<String>,
    },

    // Completion of effects requested by the machine
    PincodeChecked {
        pincode: String,
        valid: bool,
    },
    AvailabilityFetched {
        key: QueryKey,
        result: Result<QueryResult, QueryError>,
    },
}

impl Event {
    /// Turn raw chat input into an event.
    ///
    /// `/name[@bot] [argument ...]` is a command carrying its first argument;
    /// anything else is free text.
    pub fn parse_user_input(input: &str) -> Self {
        let trimmed = input.trim();
        let Some(body) = trimmed.strip_prefix('/') else {
            return Event::UserText {
                text: trimmed.to_string(),
            };
        };

        let mut parts = body.split_whitespace();
        let name = parts.next().unwrap_or_default();
        let name = name.split('@').next().unwrap_or_default();

        Event::UserCommand {
            command: Command::from_name(name),
            argument: parts.next().map(str::to_string),
        }
    }

    pub fn is_user_input(&self) -> bool {
        matches!(self, Event::UserText { .. } | Event::UserCommand { .. })
    }
}
