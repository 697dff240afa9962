//! Error types for the receipts integration

use novu_energy::{EnergyError, PeriodError};
use novu_service_registry::ServiceError;
use std::path::PathBuf;
use thiserror::Error;

use crate::render::RenderError;

/// Result type for receipt operations
pub type ReceiptResult<T> = Result<T, ReceiptError>;

#[derive(Debug, Error)]
pub enum ReceiptError {
    /// The service payload did not match the expected shape
    #[error("invalid request: {0}")]
    Request(String),

    #[error("no entity_id given")]
    NoEntities,

    #[error(transparent)]
    Period(#[from] PeriodError),

    #[error(transparent)]
    Energy(#[from] EnergyError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("invalid file name '{name}': {reason}")]
    InvalidFilename { name: String, reason: &'static str },

    #[error("report '{0}' not found")]
    FileNotFound(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration for '{key}': {reason}")]
    Config { key: &'static str, reason: String },
}

impl ReceiptError {
    /// Whether the error is the caller's fault rather than a processing failure
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            Self::Request(_)
                | Self::NoEntities
                | Self::Period(_)
                | Self::InvalidFilename { .. }
                | Self::FileNotFound(_)
        )
    }
}

impl From<ReceiptError> for ServiceError {
    fn from(e: ReceiptError) -> Self {
        if e.is_invalid_input() {
            ServiceError::InvalidData(e.to_string())
        } else {
            ServiceError::CallFailed(e.to_string())
        }
    }
}
