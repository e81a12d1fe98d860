use std::str::FromStr;

use clap::ValueEnum;
use thiserror::Error;
use twenty48_core::engine::Direction;

use crate::mode::GameMode;

/// One line of player input for the terminal driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Move(Direction),
    /// New game, optionally on a board of another size.
    New(Option<usize>),
    Save,
    Restore,
    Pause,
    Resume,
    Mode(GameMode),
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseCommandError {
    #[error("empty command")]
    Empty,
    #[error("unknown command {0:?}, type `help`")]
    Unknown(String),
    #[error("bad argument for `{command}`: {arg:?}")]
    BadArgument { command: &'static str, arg: String },
}

pub const HELP: &str = "\
moves:    up down left right (or u d l r)
game:     new [size]  save  restore  pause  resume
settings: mode easy|advanced|expert
          quit";

impl FromStr for Command {
    type Err = ParseCommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let Some(head) = words.next() else {
            return Err(ParseCommandError::Empty);
        };
        let arg = words.next();
        let head = head.to_ascii_lowercase();
        let command = match head.as_str() {
            "new" => match arg {
                None => Command::New(None),
                Some(raw) => Command::New(Some(raw.parse().map_err(|_| {
                    ParseCommandError::BadArgument { command: "new", arg: raw.to_string() }
                })?)),
            },
            "save" => Command::Save,
            "restore" => Command::Restore,
            "pause" | "p" => Command::Pause,
            "resume" => Command::Resume,
            "mode" => {
                let raw = arg.unwrap_or_default();
                Command::Mode(<GameMode as ValueEnum>::from_str(raw, true).map_err(|_| {
                    ParseCommandError::BadArgument { command: "mode", arg: raw.to_string() }
                })?)
            }
            "help" | "?" => Command::Help,
            "quit" | "q" | "exit" => Command::Quit,
            _ => Command::Move(head.parse().map_err(|_| ParseCommandError::Unknown(head.clone()))?),
        };
        Ok(command)
    }
}
