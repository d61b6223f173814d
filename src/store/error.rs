//! Error types reported by document store implementations

use thiserror::Error;

/// Errors that a [`DocumentStore`](super::DocumentStore) can report.
///
/// Store errors are propagated unchanged to callers; nothing in this crate
/// retries them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The store rejected the operation for the current principal
    #[error("Permission denied at {path}")]
    PermissionDenied { path: String },

    /// The addressed document does not exist
    #[error("Document not found: {path}")]
    NotFound { path: String },

    /// Network, quota or backend failure
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// A path did not address a collection or document
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// A document could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(error: serde_json::Error) -> Self {
        StoreError::Serialization(error.to_string())
    }
}

/// Result type alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;
