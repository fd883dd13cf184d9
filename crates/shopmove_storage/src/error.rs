//! Error types for storage operations.

use std::io;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A stored value could not be encoded or decoded.
    #[error("codec error for key {key}: {message}")]
    Codec {
        /// The key being read or written.
        key: String,
        /// Underlying codec message.
        message: String,
    },

    /// The key cannot be used with this store.
    #[error("invalid key: {0:?}")]
    InvalidKey(String),
}

impl StorageError {
    pub(crate) fn codec(key: &str, message: impl ToString) -> Self {
        Self::Codec {
            key: key.to_string(),
            message: message.to_string(),
        }
    }
}
