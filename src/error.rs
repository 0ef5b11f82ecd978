//! Error types.
//!
//! Two tiers: [`ProtocolError`] is raised while a program is being built or
//! validated, before anything reaches the terminal. [`TerminalError`] is a
//! failure reported by the terminal collaborator while a validated program
//! runs.

use std::io;
use thiserror::Error;

use crate::core::input::InputShape;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("no terminal session is active")]
    NotActive,

    #[error("a terminal session is already active")]
    AlreadyActive,

    #[error("no window named '{0}'")]
    UnknownWindow(String),

    #[error("no color named '{0}'")]
    UnknownColor(String),

    #[error("window name '{0}' is already in use")]
    DuplicateWindow(String),

    #[error("color name '{0}' is already in use")]
    DuplicateColor(String),

    #[error("current window is '{actual}', expected '{expected}'")]
    WrongWindow { expected: String, actual: String },

    #[error("read expects {expected:?} input but window '{window}' delivers {actual:?}")]
    WrongInputMode {
        window: String,
        expected: InputShape,
        actual: InputShape,
    },

    #[error("{command} finished without {expected}")]
    UnexpectedOutcome {
        command: String,
        expected: &'static str,
    },

    #[error("command #{index} ({command}) rejected: {source}")]
    Rejected {
        index: usize,
        command: String,
        #[source]
        source: Box<ProtocolError>,
    },
}

#[derive(Error, Debug)]
pub enum TerminalError {
    #[error("terminal I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("blocking read returned no input")]
    NoInput,

    #[error("invalid window handle")]
    InvalidHandle,

    #[error("color pair table is full")]
    ColorPairsExhausted,
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Terminal(#[from] TerminalError),
}

pub type Result<T> = std::result::Result<T, Error>;
