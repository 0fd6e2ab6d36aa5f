//! Error types for the engine.

use hyperdata_protocol::ProtocolError;
use thiserror::Error;

/// Result type for engine operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur while reading or reconciling the resource graph.
#[derive(Error, Debug)]
pub enum SyncError {
    /// The resource's identity resolves to nothing server-side.
    #[error("resource not found: {uri}")]
    NotFound {
        /// The identity that was fetched.
        uri: String,
    },

    /// No link relation matches the requested operation.
    ///
    /// Write paths treat this as a local no-op: the missing form is the
    /// server's way of saying the operation is not permitted.
    #[error("no '{rel}' link relation")]
    Unsupported {
        /// The relation that was looked up.
        rel: String,
    },

    /// The resource has neither a `self` nor a `canonical` link.
    #[error("resource has no identity link")]
    MissingIdentity,

    /// A form merge strategy failed.
    #[error("merge error: {0}")]
    Merge(String),

    /// Network or transport error.
    #[error("transport error: {message}")]
    Transport {
        /// Error message.
        message: String,
        /// Whether the operation can be retried.
        retryable: bool,
    },

    /// Payload could not be encoded or decoded.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Invalid resource state transition.
    #[error("invalid state transition from {from:?} to {to:?}")]
    InvalidStateTransition {
        /// Current status.
        from: String,
        /// Attempted target status.
        to: String,
    },
}

impl SyncError {
    /// Creates a not-found error.
    pub fn not_found(uri: impl Into<String>) -> Self {
        Self::NotFound { uri: uri.into() }
    }

    /// Creates an unsupported-operation error.
    pub fn unsupported(rel: impl Into<String>) -> Self {
        Self::Unsupported { rel: rel.into() }
    }

    /// Creates a retryable transport error.
    pub fn transport_retryable(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: true,
        }
    }

    /// Creates a non-retryable transport error.
    pub fn transport_fatal(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: false,
        }
    }

    /// Returns true if this error can be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SyncError::Transport { retryable: true, .. })
    }

    /// Returns true if the fetched resource does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, SyncError::NotFound { .. })
    }

    /// Returns true if a link relation needed for the operation is absent.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, SyncError::Unsupported { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_errors() {
        assert!(SyncError::transport_retryable("connection reset").is_retryable());
        assert!(!SyncError::transport_fatal("bad request").is_retryable());
        assert!(!SyncError::not_found("http://x/1").is_retryable());
        assert!(!SyncError::MissingIdentity.is_retryable());
    }

    #[test]
    fn error_display() {
        let err = SyncError::unsupported("edit-form");
        assert_eq!(err.to_string(), "no 'edit-form' link relation");
        assert!(err.is_unsupported());

        let err = SyncError::not_found("http://x/1");
        assert!(err.to_string().contains("http://x/1"));
        assert!(err.is_not_found());
    }

    #[test]
    fn protocol_error_converts() {
        let err: SyncError = ProtocolError::InvalidUtf8.into();
        assert!(matches!(err, SyncError::Protocol(_)));
    }
}
