use crate::store::StoreError;
use thiserror::Error;

/// Unified error type for partysync.
///
/// Store failures are carried unchanged inside [`SyncError::Store`]; the
/// multi-step variants describe how far a non-atomic mutation got before it
/// stopped.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SyncError {
    /// Raised before any store call, never retried
    #[error("Not authorized: {0}")]
    Authorization(AuthorizationError),

    /// A directly addressed record does not exist
    #[error("{kind} '{id}' not found")]
    NotFound { kind: String, id: String },

    /// Failure reported by the document store
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Input rejected before the write was attempted
    #[error("Validation error: {0}")]
    Validation(String),

    /// The vote marker was removed but the installed marker was not
    #[error("Vote removed but installed marker for game '{game_id}' could not be deleted: {source}")]
    PartialUnmark { game_id: String, source: StoreError },

    /// A bulk removal stopped at its first failure; earlier deletions stay
    #[error("{operation} for user '{user_id}' failed at game '{failed_game_id}' after {} deletions: {source}", .completed.len())]
    BulkRemoval {
        operation: String,
        user_id: String,
        completed: Vec<String>,
        failed_game_id: String,
        source: StoreError,
    },

    /// Errors related to serialization/deserialization
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Errors related to configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Why an operation was refused
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorizationError {
    #[error("not signed in")]
    NotSignedIn,
    #[error("admin role required")]
    NotAdmin,
}

impl From<AuthorizationError> for SyncError {
    fn from(error: AuthorizationError) -> Self {
        SyncError::Authorization(error)
    }
}

/// Conversion from serde_json::Error to SyncError
impl From<serde_json::Error> for SyncError {
    fn from(error: serde_json::Error) -> Self {
        SyncError::Serialization(error.to_string())
    }
}

impl SyncError {
    pub fn not_found(kind: &str, id: &str) -> Self {
        SyncError::NotFound {
            kind: kind.to_string(),
            id: id.to_string(),
        }
    }

    pub fn is_authorization(&self) -> bool {
        matches!(self, SyncError::Authorization(_))
    }
}

/// Result type alias for operations that can result in a SyncError
pub type SyncResult<T> = Result<T, SyncError>;
