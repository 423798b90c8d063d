//! Error types for catalog introspection.
//!
//! Distinguishes a database that cannot be used at all from a table that
//! disappeared between listing and reading.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while reading a SQLite database.
#[derive(Debug, Error)]
pub enum IntrospectError {
    /// The file is missing, not a SQLite database, corrupt, or locked.
    #[error("database '{}' is unreadable: {reason}", .path.display())]
    DatabaseUnreadable {
        /// Path that was opened.
        path: PathBuf,
        /// Underlying cause.
        reason: String,
    },

    /// A table named by the caller is not in the catalog.
    #[error("table not found: {0}")]
    TableNotFound(String),

    /// Any other SQLite failure while reading.
    #[error("database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),
}

/// Convenience alias for results with [`IntrospectError`].
pub type Result<T> = std::result::Result<T, IntrospectError>;
