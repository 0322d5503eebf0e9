//! Error types for the BMI tracker

use thiserror::Error;

/// Errors that can occur while calculating or persisting BMI results
#[derive(Debug, Error)]
pub enum BmiError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Persisted history could not be read or parsed. Recovered as an empty
    /// history; never surfaced as a hard failure.
    #[error("Failed to read history: {0}")]
    PersistenceRead(String),

    /// Durable write failed. The in-memory history already reflects the
    /// operation, so memory and storage have diverged.
    #[error("Failed to persist history: {0}")]
    PersistenceWrite(String),

    #[error("History store has not been loaded")]
    StoreNotReady,

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl BmiError {
    /// Whether the error leaves the app in a usable state (history may be
    /// stale or unsaved, but nothing needs to be aborted).
    pub fn is_non_fatal(&self) -> bool {
        matches!(
            self,
            BmiError::PersistenceRead(_) | BmiError::PersistenceWrite(_)
        )
    }
}
