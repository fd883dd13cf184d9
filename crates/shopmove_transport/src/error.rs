//! Error types for transport operations.

use thiserror::Error;

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Errors a single back-end can report for a single request.
///
/// These never escape [`crate::HttpCall::do_request`]; they decide whether
/// the next candidate back-end is tried and are kept as the call's error
/// message.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The connection could not be established.
    #[error("connection failed: {0}")]
    Connect(String),

    /// The request did not complete in time.
    #[error("request timed out")]
    Timeout,

    /// The peer sent something that is not a valid HTTP response.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The back-end cannot handle this request (scheme, method, ...).
    #[error("unsupported by this back-end: {0}")]
    Unsupported(String),

    /// The body could not be decoded as expected.
    #[error("decode error: {0}")]
    Decode(String),

    /// The back-end could not be built.
    #[error("back-end setup failed: {0}")]
    Setup(String),
}

impl TransportError {
    /// Returns true if another back-end might succeed where this one failed.
    pub fn is_backend_specific(&self) -> bool {
        matches!(
            self,
            TransportError::Connect(_)
                | TransportError::Timeout
                | TransportError::Unsupported(_)
                | TransportError::Protocol(_)
        )
    }
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock => TransportError::Timeout,
            _ => TransportError::Connect(err.to_string()),
        }
    }
}
