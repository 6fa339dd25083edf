//! Error types for pomo-core

use thiserror::Error;

use crate::models::ValidationIssue;

/// Result type alias using pomo-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in pomo-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// One or more records carry blocking validation errors
    #[error("{} blocking validation issue(s); first: {}", .0.len(), first_message(.0))]
    Validation(Vec<ValidationIssue>),

    /// Persisted envelope is structurally malformed
    #[error("Malformed storage envelope: {0}")]
    Format(String),

    /// The storage medium rejected a write because it is full
    #[error("Storage capacity exceeded: {requested} bytes requested, {available} bytes available")]
    CapacityExceeded { requested: usize, available: usize },

    /// Generic storage medium failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// `SQLite` error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Import file exceeds the size limit
    #[error("Import file is too large: {size} bytes (max {max} bytes)")]
    FileTooLarge { size: u64, max: u64 },

    /// Import file is not a CSV file
    #[error("Unsupported import file type: {0}")]
    UnsupportedFileType(String),

    /// Import file could not be read or decoded
    #[error("Import file could not be read: {0}")]
    FileUnreadable(String),

    /// Import file is not well-formed CSV
    #[error("CSV parse error: {0}")]
    CsvParse(String),

    /// Saving merged data failed after a successful preview
    #[error("Import could not be saved: {0}")]
    ImportCommit(#[source] Box<Error>),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    /// Whether this error means the medium is out of space, including
    /// capacity failures raised while committing an import.
    pub fn is_capacity(&self) -> bool {
        match self {
            Self::CapacityExceeded { .. } => true,
            Self::ImportCommit(inner) => inner.is_capacity(),
            _ => false,
        }
    }

    /// Whether this error rejected an import file before row validation.
    pub const fn is_file_input(&self) -> bool {
        matches!(
            self,
            Self::FileTooLarge { .. }
                | Self::UnsupportedFileType(_)
                | Self::FileUnreadable(_)
                | Self::CsvParse(_)
        )
    }
}

impl From<csv::Error> for Error {
    fn from(error: csv::Error) -> Self {
        Self::CsvParse(error.to_string())
    }
}

fn first_message(issues: &[ValidationIssue]) -> &str {
    issues.first().map_or("", |issue| issue.message.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_is_detected_through_import_commit() {
        let inner = Error::CapacityExceeded {
            requested: 10,
            available: 5,
        };
        assert!(inner.is_capacity());
        assert!(Error::ImportCommit(Box::new(inner)).is_capacity());
        assert!(!Error::Storage("boom".into()).is_capacity());
    }

    #[test]
    fn validation_error_reports_first_message() {
        let error = Error::Validation(vec![ValidationIssue::error("Row 2: duration must be a positive number")]);
        assert_eq!(
            error.to_string(),
            "1 blocking validation issue(s); first: Row 2: duration must be a positive number"
        );
    }
}
