//! Error types for document conversion.

use thiserror::Error;

/// Result type for conversion operations.
pub type Result<T> = std::result::Result<T, ConvertError>;

/// Hard failures surfaced to callers.
///
/// Malformed markup and unsupported structure are never errors; they are
/// absorbed by the pipeline and reported through [`crate::Diagnostics`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConvertError {
    /// Empty input, or bytes that are not UTF-8 text.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The tree did not come from this engine's builder and cannot be rendered.
    #[error("serialization failure: {0}")]
    SerializationFailure(String),
}

impl ConvertError {
    pub(crate) fn corrupted(message: impl Into<String>) -> Self {
        ConvertError::SerializationFailure(message.into())
    }
}
