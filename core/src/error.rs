//! Error types for rendering graphs and descriptors.

use thiserror::Error;

use crate::turtle::TurtleError;

/// A graph or descriptor could not be rendered to its output form.
#[derive(Debug, Error)]
pub enum SerializationError {
    /// JSON rendering or writing failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Turtle rendering or writing failed.
    #[error("Turtle error: {0}")]
    Turtle(#[from] TurtleError),
}
