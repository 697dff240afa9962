//! SQLite recorder backend
//!
//! Samples live in a single `samples` table keyed by entity id and a
//! microsecond UTC timestamp. Every query runs on the blocking pool so a
//! slow disk never stalls the runtime.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use novu_core::{EntityId, HistoryError, HistoryProvider, Sample};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

use crate::{RecorderError, RecorderResult, SampleSink};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS samples (
    entity_id TEXT NOT NULL,
    ts_us INTEGER NOT NULL,
    state TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS ix_samples_entity_ts ON samples (entity_id, ts_us);
";

/// Samples persisted in SQLite
pub struct SqliteRecorder {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteRecorder {
    /// Open (or create) the database file and apply the schema
    pub fn open(path: impl AsRef<Path>) -> RecorderResult<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(|source| RecorderError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        conn.execute_batch(SCHEMA)?;
        info!(path = %path.display(), "Opened recorder database");
        Ok(Self::from_connection(conn))
    }

    /// In-memory database, used by tests
    pub fn open_in_memory() -> RecorderResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self::from_connection(conn))
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// Run `f` with the connection on the blocking pool
    async fn with_conn<T, F>(&self, f: F) -> RecorderResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> RecorderResult<T> + Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| RecorderError::Worker("connection lock poisoned".to_string()))?;
            f(&guard)
        })
        .await
        .map_err(|e| RecorderError::Worker(e.to_string()))?
    }
}

fn decode_timestamp(entity_id: &str, micros: i64) -> RecorderResult<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_micros(micros).ok_or_else(|| {
        RecorderError::InvalidTimestamp {
            entity_id: entity_id.to_string(),
            micros,
        }
    })
}

#[async_trait]
impl HistoryProvider for SqliteRecorder {
    async fn fetch_samples(
        &self,
        entity_id: &EntityId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Sample>, HistoryError> {
        let id = entity_id.to_string();
        let (from_us, to_us) = (from.timestamp_micros(), to.timestamp_micros());

        let samples = self
            .with_conn(move |conn| {
                let mut stmt = conn.prepare_cached(
                    "SELECT ts_us, state FROM samples
                     WHERE entity_id = ?1 AND ts_us >= ?2 AND ts_us <= ?3
                     ORDER BY ts_us ASC, rowid ASC",
                )?;
                let rows = stmt.query_map(params![id, from_us, to_us], |row| {
                    Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
                })?;

                let mut samples = Vec::new();
                for row in rows {
                    let (micros, state) = row?;
                    samples.push(Sample::new(decode_timestamp(&id, micros)?, state));
                }
                Ok(samples)
            })
            .await?;

        debug!(entity_id = %entity_id, count = samples.len(), "Fetched samples");
        Ok(samples)
    }
}

#[async_trait]
impl SampleSink for SqliteRecorder {
    async fn record(&self, entity_id: &EntityId, sample: Sample) -> RecorderResult<()> {
        let id = entity_id.to_string();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO samples (entity_id, ts_us, state) VALUES (?1, ?2, ?3)",
                params![id, sample.timestamp.timestamp_micros(), sample.state],
            )?;
            Ok(())
        })
        .await
    }

    async fn purge_before(&self, cutoff: DateTime<Utc>) -> RecorderResult<usize> {
        let cutoff_us = cutoff.timestamp_micros();
        let removed = self
            .with_conn(move |conn| {
                Ok(conn.execute("DELETE FROM samples WHERE ts_us < ?1", params![cutoff_us])?)
            })
            .await?;
        info!(removed, "Purged recorder samples");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 8, day, 0, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_record_and_fetch() {
        let recorder = SqliteRecorder::open_in_memory().unwrap();
        let id = EntityId::new("sensor.unit_1_total_energy").unwrap();

        recorder.record(&id, Sample::new(t(3), "30")).await.unwrap();
        recorder.record(&id, Sample::new(t(1), "10")).await.unwrap();
        recorder.record(&id, Sample::new(t(2), "unavailable")).await.unwrap();

        let samples = recorder.fetch_samples(&id, t(1), t(2)).await.unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0], Sample::new(t(1), "10"));
        assert_eq!(samples[1].state, "unavailable");
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.db");
        let id = EntityId::new("sensor.unit_2_total_energy").unwrap();

        {
            let recorder = SqliteRecorder::open(&path).unwrap();
            recorder.record(&id, Sample::new(t(5), "55.5")).await.unwrap();
        }

        let recorder = SqliteRecorder::open(&path).unwrap();
        let samples = recorder.fetch_samples(&id, t(1), t(31)).await.unwrap();
        assert_eq!(samples, vec![Sample::new(t(5), "55.5")]);
    }

    #[tokio::test]
    async fn test_purge_before() {
        let recorder = SqliteRecorder::open_in_memory().unwrap();
        let id = EntityId::new("sensor.a").unwrap();
        for day in 1..=4 {
            recorder
                .record(&id, Sample::new(t(day), day.to_string()))
                .await
                .unwrap();
        }

        assert_eq!(recorder.purge_before(t(3)).await.unwrap(), 2);
        let rest = recorder.fetch_samples(&id, t(1), t(31)).await.unwrap();
        assert_eq!(rest.len(), 2);
        assert_eq!(rest[0].timestamp, t(3));
    }
}
