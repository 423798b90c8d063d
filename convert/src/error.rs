//! Error types for conversion runs.
//!
//! [`ConvertError`] covers every way a conversion can fail. Whether a
//! failure aborts the run or only the current table is decided by the
//! pipeline, not by the variant: an unreadable database aborts, the same
//! kinds of errors raised while handling one table are recorded and the
//! run continues.

use std::path::PathBuf;

use dbcroissant_core::SerializationError;
use dbcroissant_sqlite::IntrospectError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during conversion.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// The database file is missing, not a SQLite database, or locked.
    #[error("database '{}' is unreadable: {reason}", .path.display())]
    DatabaseUnreadable {
        /// Path of the database.
        path: PathBuf,
        /// Underlying cause.
        reason: String,
    },

    /// A table listed in the catalog could not be found when read.
    #[error("table not found: {0}")]
    TableNotFound(String),

    /// Reading from an open database failed.
    #[error("database error: {0}")]
    DatabaseError(String),

    /// A graph or descriptor could not be rendered.
    #[error("serialization error: {0}")]
    SerializationError(#[from] SerializationError),

    /// File I/O failure (output directory unwritable, disk full, ...).
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Configuration file could not be parsed or written.
    #[error("configuration error: {0}")]
    ConfigError(#[from] serde_yaml::Error),
}

impl From<IntrospectError> for ConvertError {
    fn from(err: IntrospectError) -> Self {
        match err {
            IntrospectError::DatabaseUnreadable { path, reason } => {
                Self::DatabaseUnreadable { path, reason }
            }
            IntrospectError::TableNotFound(name) => Self::TableNotFound(name),
            IntrospectError::DatabaseError(e) => Self::DatabaseError(e.to_string()),
        }
    }
}

impl From<serde_json::Error> for ConvertError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(SerializationError::Json(err))
    }
}

impl ConvertError {
    /// Coarse classification used in reports and HTTP responses.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::DatabaseUnreadable { .. } | Self::DatabaseError(_) => ErrorKind::DatabaseUnreadable,
            Self::TableNotFound(_) => ErrorKind::TableNotFound,
            Self::SerializationError(_) => ErrorKind::SerializationError,
            Self::IoError(_) => ErrorKind::IoError,
            Self::ConfigError(_) => ErrorKind::ConfigError,
        }
    }
}

/// Serializable classification of a [`ConvertError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// See [`ConvertError::DatabaseUnreadable`].
    DatabaseUnreadable,
    /// See [`ConvertError::TableNotFound`].
    TableNotFound,
    /// See [`ConvertError::SerializationError`].
    SerializationError,
    /// See [`ConvertError::IoError`].
    IoError,
    /// See [`ConvertError::ConfigError`].
    ConfigError,
}

/// Convenience alias for results with [`ConvertError`].
pub type Result<T> = std::result::Result<T, ConvertError>;
