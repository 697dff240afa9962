//! Collaborator interfaces for reading entity data
//!
//! Integrations never talk to a concrete store. They receive a
//! `HistoryProvider` for recorded samples and a `CurrentStateProvider` for
//! the live state, so the same resolution code runs against the SQLite
//! recorder in production and in-memory fixtures in tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::{EntityId, Sample, State};

/// Errors returned by a history backend
#[derive(Debug, Clone, Error)]
pub enum HistoryError {
    #[error("history backend unavailable: {0}")]
    Unavailable(String),

    #[error("history query failed: {0}")]
    Query(String),
}

/// Read access to recorded samples
#[async_trait]
pub trait HistoryProvider: Send + Sync {
    /// Samples of `entity_id` with `from <= timestamp <= to`, ascending by timestamp
    async fn fetch_samples(
        &self,
        entity_id: &EntityId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Sample>, HistoryError>;
}

/// Read access to the live state of entities
pub trait CurrentStateProvider: Send + Sync {
    /// Full current state of an entity
    fn current_state(&self, entity_id: &EntityId) -> Option<State>;

    /// Raw current state value of an entity
    fn current_value(&self, entity_id: &EntityId) -> Option<String> {
        self.current_state(entity_id).map(|s| s.state)
    }

    /// All current states
    fn all_states(&self) -> Vec<State>;
}
