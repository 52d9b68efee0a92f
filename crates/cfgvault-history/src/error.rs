//! Error types for history operations.

use thiserror::Error;

/// Errors that can occur while building, loading or persisting history.
#[derive(Debug, Error)]
pub enum HistoryError {
    /// A record cannot be added to the log.
    #[error("invalid history record {id}: {reason}")]
    InvalidRecord { id: String, reason: String },

    /// The persisted log cannot be decoded at all.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Convenience type alias for history operations.
pub type Result<T> = std::result::Result<T, HistoryError>;
