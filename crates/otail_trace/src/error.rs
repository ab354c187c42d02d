//! Error types for trace loading.

use thiserror::Error;

/// Errors that can occur while reading or building traces.
#[derive(Debug, Error)]
pub enum Error {
    /// Trace content is structurally invalid.
    #[error("invalid trace format: {0}")]
    InvalidTrace(String),

    /// Parse error for a specific format.
    #[error("parse error ({format}): {message}")]
    ParseError {
        /// The format that failed to parse.
        format: &'static str,
        /// Description of the parse error.
        message: String,
    },

    /// I/O error.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON parsing error.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Creates a parse error for the given format.
    pub fn parse(format: &'static str, message: impl Into<String>) -> Self {
        Self::ParseError {
            format,
            message: message.into(),
        }
    }
}

/// Result type alias for trace operations.
pub type Result<T> = std::result::Result<T, Error>;
