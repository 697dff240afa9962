//! Per-entity outcomes of a multi-meter request

use serde::Serialize;

/// An entity that could not be processed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchFailure {
    pub entity_id: String,
    pub error: String,
}

/// Successes and failures of a batch, in request order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchOutcome<T> {
    pub successes: Vec<T>,
    pub failures: Vec<BatchFailure>,
}

impl<T> Default for BatchOutcome<T> {
    fn default() -> Self {
        Self {
            successes: Vec::new(),
            failures: Vec::new(),
        }
    }
}

impl<T> BatchOutcome<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_success(&mut self, value: T) {
        self.successes.push(value);
    }

    pub fn push_failure(&mut self, entity_id: impl Into<String>, error: impl ToString) {
        self.failures.push(BatchFailure {
            entity_id: entity_id.into(),
            error: error.to_string(),
        });
    }

    /// Record a per-entity result
    pub fn record<E: ToString>(&mut self, entity_id: impl Into<String>, result: Result<T, E>) {
        match result {
            Ok(value) => self.push_success(value),
            Err(e) => self.push_failure(entity_id, e),
        }
    }

    pub fn len(&self) -> usize {
        self.successes.len() + self.failures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn all_failed(&self) -> bool {
        self.successes.is_empty() && !self.failures.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EnergyError;

    #[test]
    fn test_record_keeps_failures_beside_successes() {
        let mut outcome = BatchOutcome::new();
        outcome.record::<EnergyError>("sensor.a", Ok(1.5));
        outcome.record(
            "sensor.b",
            Err(EnergyError::NoHistory {
                entity_id: "sensor.b".to_string(),
            }),
        );
        outcome.record::<EnergyError>("sensor.c", Ok(2.5));

        assert_eq!(outcome.successes, vec![1.5, 2.5]);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].entity_id, "sensor.b");
        assert!(outcome.failures[0].error.contains("no historical data"));
        assert_eq!(outcome.len(), 3);
        assert!(!outcome.all_failed());
    }

    #[test]
    fn test_empty_outcome() {
        let outcome: BatchOutcome<f64> = BatchOutcome::new();
        assert!(outcome.is_empty());
        assert!(!outcome.all_failed());
    }
}
