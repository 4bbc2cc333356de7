//! Recoverable error types.
//!
//! Contract violations (cursor outside a buffer, offset past the end of the
//! document, sentinel mutation) are not represented here; they panic.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PieceTreeError {
    /// Only `"\n"` and `"\r\n"` are accepted as document line endings
    #[error("invalid end of line sequence {0:?}: expected \"\\n\" or \"\\r\\n\"")]
    InvalidEol(String),

    /// Found by the diagnostic integrity check
    #[error("piece tree integrity violation: {message}")]
    IntegrityViolation { message: String },

    #[error("invalid search pattern: {0}")]
    InvalidSearchPattern(#[from] regex::Error),
}

impl PieceTreeError {
    pub(crate) fn integrity(message: impl Into<String>) -> Self {
        PieceTreeError::IntegrityViolation {
            message: message.into(),
        }
    }
}

/// Configuration error types
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),
    #[error("Parse error: {0}")]
    ParseError(String),
    #[error("Serialize error: {0}")]
    SerializeError(String),
    #[error("Validation error: {0}")]
    ValidationError(String),
}
