//! In-memory recorder backend

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use novu_core::{EntityId, HistoryError, HistoryProvider, Sample};
use tracing::trace;

use crate::{RecorderResult, SampleSink};

/// Samples held in memory, sorted by timestamp per entity
#[derive(Default)]
pub struct MemoryRecorder {
    series: DashMap<EntityId, Vec<Sample>>,
}

impl MemoryRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a sample, keeping the series ordered
    ///
    /// Samples with an equal timestamp keep their insertion order.
    pub fn insert(&self, entity_id: &EntityId, sample: Sample) {
        let mut series = self.series.entry(entity_id.clone()).or_default();
        let pos = series.partition_point(|s| s.timestamp <= sample.timestamp);
        series.insert(pos, sample);
    }

    /// Number of samples stored for an entity
    pub fn sample_count(&self, entity_id: &EntityId) -> usize {
        self.series.get(entity_id).map(|s| s.len()).unwrap_or(0)
    }
}

#[async_trait]
impl HistoryProvider for MemoryRecorder {
    async fn fetch_samples(
        &self,
        entity_id: &EntityId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Sample>, HistoryError> {
        let Some(series) = self.series.get(entity_id) else {
            return Ok(Vec::new());
        };
        let start = series.partition_point(|s| s.timestamp < from);
        let end = series.partition_point(|s| s.timestamp <= to);
        trace!(entity_id = %entity_id, count = end.saturating_sub(start), "Fetched samples");
        Ok(series
            .value()
            .get(start..end)
            .map(<[Sample]>::to_vec)
            .unwrap_or_default())
    }
}

#[async_trait]
impl SampleSink for MemoryRecorder {
    async fn record(&self, entity_id: &EntityId, sample: Sample) -> RecorderResult<()> {
        self.insert(entity_id, sample);
        Ok(())
    }

    async fn purge_before(&self, cutoff: DateTime<Utc>) -> RecorderResult<usize> {
        let mut removed = 0;
        for mut series in self.series.iter_mut() {
            let keep_from = series.partition_point(|s| s.timestamp < cutoff);
            series.drain(..keep_from);
            removed += keep_from;
        }
        self.series.retain(|_, series| !series.is_empty());
        Ok(removed)
    }
}
