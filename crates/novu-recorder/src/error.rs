//! Error types for the recorder

use novu_core::HistoryError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for recorder operations
pub type RecorderResult<T> = Result<T, RecorderError>;

/// Errors raised by recorder backends
#[derive(Debug, Error)]
pub enum RecorderError {
    /// Failed to open the database
    #[error("failed to open recorder database {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// A statement failed
    #[error("recorder query failed: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A stored timestamp could not be decoded
    #[error("invalid timestamp stored for {entity_id}: {micros}")]
    InvalidTimestamp { entity_id: String, micros: i64 },

    /// The blocking worker panicked or was cancelled
    #[error("recorder worker failed: {0}")]
    Worker(String),
}

impl From<RecorderError> for HistoryError {
    fn from(e: RecorderError) -> Self {
        match e {
            RecorderError::Open { .. } | RecorderError::Worker(_) => {
                HistoryError::Unavailable(e.to_string())
            }
            _ => HistoryError::Query(e.to_string()),
        }
    }
}
