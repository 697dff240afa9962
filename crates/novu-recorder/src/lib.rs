//! State history recording for the Novu hub
//!
//! The recorder keeps every state an entity reported so that integrations
//! can ask "what did this meter read at midnight on the 1st?". Two backends
//! are provided:
//!
//! - [`MemoryRecorder`] - samples kept in memory, used in tests and when no
//!   database path is configured
//! - [`SqliteRecorder`] - samples persisted in a SQLite database
//!
//! Both implement [`novu_core::HistoryProvider`] for reads and
//! [`SampleSink`] for writes. [`spawn_state_listener`] feeds a sink from the
//! event bus.

mod config;
mod error;
mod listener;
mod memory;
mod sqlite;

pub use config::RecorderConfig;
pub use error::{RecorderError, RecorderResult};
pub use listener::spawn_state_listener;
pub use memory::MemoryRecorder;
pub use sqlite::SqliteRecorder;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use novu_core::{EntityId, HistoryProvider, Sample};
use std::sync::Arc;

/// Write side of a recorder backend
#[async_trait]
pub trait SampleSink: Send + Sync {
    /// Store one sample for an entity
    async fn record(&self, entity_id: &EntityId, sample: Sample) -> RecorderResult<()>;

    /// Delete samples older than `cutoff`, returning how many were removed
    async fn purge_before(&self, cutoff: DateTime<Utc>) -> RecorderResult<usize>;
}

/// The backend selected by configuration
#[derive(Clone)]
pub enum RecorderBackend {
    Memory(Arc<MemoryRecorder>),
    Sqlite(Arc<SqliteRecorder>),
}

impl RecorderBackend {
    /// Open the backend selected by the configuration
    pub fn open(config: &RecorderConfig) -> RecorderResult<Self> {
        match &config.db_path {
            Some(path) => Ok(Self::Sqlite(Arc::new(SqliteRecorder::open(path)?))),
            None => Ok(Self::Memory(Arc::new(MemoryRecorder::new()))),
        }
    }

    /// Read side, handed to integrations
    pub fn history(&self) -> Arc<dyn HistoryProvider> {
        match self {
            Self::Memory(r) => r.clone(),
            Self::Sqlite(r) => r.clone(),
        }
    }

    /// Write side, fed by the state listener
    pub fn sink(&self) -> Arc<dyn SampleSink> {
        match self {
            Self::Memory(r) => r.clone(),
            Self::Sqlite(r) => r.clone(),
        }
    }
}
