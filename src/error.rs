//! Error types for Stowage.

use std::fmt;

use thiserror::Error;

/// Space figures reported when an upload would breach the storage ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaShortfall {
    /// Bytes consumed by all file items before the upload.
    pub current_used: u64,
    /// Bytes still available under the ceiling.
    pub available: u64,
    /// Bytes the upload needed.
    pub required: u64,
    /// Files skipped as duplicates before the check was made.
    pub skipped: usize,
}

impl fmt::Display for QuotaShortfall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} bytes required, {} bytes available ({} bytes in use)",
            self.required, self.available, self.current_used
        )
    }
}

/// Common error type for Stowage.
#[derive(Error, Debug)]
pub enum StowageError {
    /// Persistence failure in the item store.
    ///
    /// Database errors from sqlx are automatically converted.
    #[error("database error: {0}")]
    Database(String),

    /// I/O error while writing, moving or deleting stored content.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Missing or malformed input.
    #[error("validation error: {0}")]
    Validation(String),

    /// The write would push used storage past the configured maximum.
    #[error("storage limit exceeded: {0}")]
    QuotaExceeded(QuotaShortfall),

    /// Resource not found.
    #[error("{0} not found")]
    NotFound(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<sqlx::Error> for StowageError {
    fn from(e: sqlx::Error) -> Self {
        StowageError::Database(e.to_string())
    }
}

/// Result type alias for Stowage operations.
pub type Result<T> = std::result::Result<T, StowageError>;
