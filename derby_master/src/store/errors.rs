//! Snapshot store error types.

use thiserror::Error;

/// Snapshot store errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Another writer saved a newer snapshot first
    #[error("Stale snapshot: expected sequence {expected}, store is at {actual}")]
    StaleSnapshot { expected: u64, actual: u64 },
}

impl StoreError {
    /// Get an operator-facing message without filesystem details
    pub fn client_message(&self) -> String {
        match self {
            StoreError::Io(_) => "Could not access tournament data".to_string(),
            StoreError::Serialization(_) => "Tournament data is corrupted".to_string(),
            StoreError::StaleSnapshot { .. } => {
                "Tournament changed elsewhere, reload and try again".to_string()
            }
        }
    }
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;
