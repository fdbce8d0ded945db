//! Error types for roster operations.

use thiserror::Error;

/// Errors that can occur during roster storage and classification.
#[derive(Error, Debug)]
pub enum RosterError {
    /// SQLite database error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Storage-level failure that isn't a direct SQLite error.
    #[error("Storage error: {0}")]
    Storage(String),

    /// A stored row could not be decoded back into its domain type.
    #[error("Invalid stored data: {0}")]
    InvalidData(String),

    /// The requested driver is not in the roster.
    #[error("Driver not found: {0}")]
    NotFound(String),
}

/// Result type alias for roster operations.
pub type Result<T> = std::result::Result<T, RosterError>;
