//! Status taxonomy shared by every pipeline stage
//!
//! Each variant maps to a distinct process exit code, so the order of the
//! `exit_code` table is load-bearing: build scripts branch on these numbers.

use thiserror::Error;

/// Everything a stage can report besides plain success.
///
/// `Not` is a sentinel for "queried feature or environment absent" (for
/// example `--cygwin` outside Cygwin). It still halts the chain under
/// `--stoponerror true`, like any other non-zero status.
#[derive(Error, Debug)]
pub enum StageError {
    #[error("{0}")]
    Undefined(String),

    #[error("Error compiling regex pattern: {0}")]
    Regex(String),

    #[error("{0}")]
    Io(String),

    #[allow(dead_code)]
    #[error("Invalid line: {0}")]
    InvalidLine(String),

    #[error("Invalid environment value: {0}")]
    InvalidEnvValue(String),

    #[error("{0}")]
    MissingParameter(String),

    #[error("Unknown command: {0}")]
    UnknownArgument(String),

    #[error("No commands found")]
    NoCommands,

    #[error("{0}")]
    Command(String),

    #[error("Command not found: {0}")]
    CommandNotFound(String),

    #[error("Command failed: {0}")]
    CommandExecFailed(String),

    #[error("OS error: {0}")]
    CommandOs(String),

    #[error("{0}")]
    InvalidOutputMode(String),

    #[error("Unknown sort flag: {0}")]
    InvalidSortFlag(String),

    #[error("Error compiling column pattern: {0}")]
    InvalidSortColumn(String),

    #[error("Error converting sort value: {0}")]
    InvalidSortValue(String),

    #[error("Unknown sum flag: {0}")]
    InvalidSumFlag(String),

    #[error("Error converting sum value: {0}")]
    InvalidSumValue(String),

    #[error("Unknown filter flag: {0}")]
    InvalidFilterFlag(String),

    #[error("{0}")]
    Not(String),
}

impl StageError {
    /// The process exit code for this status.
    pub fn exit_code(&self) -> i32 {
        match self {
            StageError::Undefined(_) => 1,
            StageError::Regex(_) => 2,
            StageError::Io(_) => 3,
            StageError::InvalidLine(_) => 4,
            StageError::InvalidEnvValue(_) => 5,
            StageError::MissingParameter(_) => 6,
            StageError::UnknownArgument(_) => 7,
            StageError::NoCommands => 8,
            StageError::Command(_) => 9,
            StageError::CommandNotFound(_) => 10,
            StageError::CommandExecFailed(_) => 11,
            StageError::CommandOs(_) => 12,
            StageError::InvalidOutputMode(_) => 13,
            StageError::InvalidSortFlag(_) => 14,
            StageError::InvalidSortColumn(_) => 15,
            StageError::InvalidSortValue(_) => 16,
            StageError::InvalidSumFlag(_) => 17,
            StageError::InvalidSumValue(_) => 18,
            StageError::InvalidFilterFlag(_) => 19,
            StageError::Not(_) => 20,
        }
    }

    /// Wrap a plumbing error chain into the `Io` status, keeping the full
    /// context trail in the message.
    pub fn io(err: anyhow::Error) -> Self {
        StageError::Io(format!("{err:#}"))
    }

    /// Print the single user-facing diagnostic line for this failure.
    pub fn report(&self) {
        use console::style;
        eprintln!("{} {}", style("ERROR:").red().bold(), self);
    }
}

/// Result type returned by every command handler.
pub type StageResult = Result<(), StageError>;
