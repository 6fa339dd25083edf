use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] pomo_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("No session subject provided")]
    EmptySubject,
    #[error("Duration must be a positive number of minutes: {0}")]
    InvalidDuration(String),
    #[error("Unrecognized date or time: {0}")]
    InvalidDate(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Import file has {0} row error(s); fix them or pass --skip-invalid")]
    ImportHasErrors(usize),
    #[error("Refusing to delete all sessions without --yes")]
    ClearNotConfirmed,
}

impl CliError {
    /// Whether the storage medium ran out of space
    pub fn is_capacity(&self) -> bool {
        matches!(self, Self::Core(error) if error.is_capacity())
    }

    /// Whether an import file was rejected before any row was read
    pub const fn is_file_input(&self) -> bool {
        matches!(self, Self::Core(error) if error.is_file_input())
    }
}
