//! Error types for the protocol crate.

use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors that can occur while encoding or decoding wire payloads.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// JSON payload could not be encoded or decoded.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Payload was not valid UTF-8.
    #[error("invalid UTF-8 payload")]
    InvalidUtf8,

    /// Payload decoded but does not have the expected shape.
    #[error("invalid representation: {message}")]
    InvalidStructure {
        /// Description of the structural error.
        message: String,
    },

    /// The media type is not one this protocol understands.
    #[error("unsupported media type: {media_type}")]
    UnsupportedMediaType {
        /// The offending media type.
        media_type: String,
    },
}

impl ProtocolError {
    /// Create an invalid structure error.
    pub fn invalid_structure(message: impl Into<String>) -> Self {
        Self::InvalidStructure {
            message: message.into(),
        }
    }

    /// Create an unsupported media type error.
    pub fn unsupported_media_type(media_type: impl Into<String>) -> Self {
        Self::UnsupportedMediaType {
            media_type: media_type.into(),
        }
    }
}
