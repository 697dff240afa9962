//! Timestamped observation read from the history store

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One recorded state of an entity
///
/// Samples are snapshots handed out by a `HistoryProvider`; nothing in the
/// hub mutates them after they are read. The raw state is kept as recorded
/// because meters report non-numeric states such as "unavailable".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// When the state was recorded
    pub timestamp: DateTime<Utc>,

    /// Raw state string
    pub state: String,
}

impl Sample {
    pub fn new(timestamp: DateTime<Utc>, state: impl Into<String>) -> Self {
        Self {
            timestamp,
            state: state.into(),
        }
    }

    /// Numeric reading, or None when the state does not parse to a finite number
    pub fn value(&self) -> Option<f64> {
        self.state
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_value() {
        let now = Utc::now();
        assert_eq!(Sample::new(now, "1523.75").value(), Some(1523.75));
        assert_eq!(Sample::new(now, " 42 ").value(), Some(42.0));
        assert_eq!(Sample::new(now, "unavailable").value(), None);
        assert_eq!(Sample::new(now, "NaN").value(), None);
        assert_eq!(Sample::new(now, "inf").value(), None);
    }
}
