//! Error types for markup operations.

use thiserror::Error;
use uuid::Uuid;

/// Errors raised by the markup manager and its persistence layer.
#[derive(Debug, Error)]
pub enum MarkupError {
    /// JSON parsing or serialization error.
    #[error("JSON error: {0}")]
    Json(String),

    /// IO error during read/write.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A file with no parse tree, or one the manager does not know.
    #[error("Unknown file: {0}")]
    UnknownFile(String),

    /// No markup element carries the id.
    #[error("Unknown markup element: {0}")]
    UnknownElement(Uuid),

    /// The node cannot carry a concern point.
    #[error("Invalid {kind}: {message}")]
    Invalid { kind: &'static str, message: String },
}

impl MarkupError {
    /// Create a JSON error.
    pub fn json(message: impl Into<String>) -> Self {
        Self::Json(message.into())
    }

    /// Create an unknown file error.
    pub fn unknown_file(name: impl Into<String>) -> Self {
        Self::UnknownFile(name.into())
    }

    /// Create an invalid node error.
    pub fn invalid_node(message: impl Into<String>) -> Self {
        Self::Invalid {
            kind: "node",
            message: message.into(),
        }
    }

    /// Create an invalid parent error.
    pub fn invalid_parent(message: impl Into<String>) -> Self {
        Self::Invalid {
            kind: "parent",
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for MarkupError {
    fn from(error: serde_json::Error) -> Self {
        Self::json(error.to_string())
    }
}
