//! Current state of an entity

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Context, EntityId, Sample};

/// Attribute carrying the human readable name of an entity
pub const ATTR_FRIENDLY_NAME: &str = "friendly_name";

/// Attribute carrying the unit of a numeric state
pub const ATTR_UNIT_OF_MEASUREMENT: &str = "unit_of_measurement";

/// The state of an entity at a point in time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct State {
    /// The entity this state belongs to
    pub entity_id: EntityId,

    /// The state value (e.g., "1523.75", "unavailable")
    pub state: String,

    /// Additional attributes associated with the state
    #[serde(default)]
    pub attributes: HashMap<String, serde_json::Value>,

    /// When the state value last changed
    pub last_changed: DateTime<Utc>,

    /// When the state was last written, even if unchanged
    pub last_updated: DateTime<Utc>,

    /// Context of the change that created this state
    pub context: Context,
}

impl State {
    /// Create a new state stamped with the current time
    pub fn new(
        entity_id: EntityId,
        state: impl Into<String>,
        attributes: HashMap<String, serde_json::Value>,
        context: Context,
    ) -> Self {
        let now = Utc::now();
        Self {
            entity_id,
            state: state.into(),
            attributes,
            last_changed: now,
            last_updated: now,
            context,
        }
    }

    /// Create the successor of this state, keeping last_changed when the value is unchanged
    pub fn with_update(
        &self,
        new_state: impl Into<String>,
        new_attributes: HashMap<String, serde_json::Value>,
        context: Context,
    ) -> Self {
        let now = Utc::now();
        let new_state = new_state.into();
        let last_changed = if self.state == new_state {
            self.last_changed
        } else {
            now
        };

        Self {
            entity_id: self.entity_id.clone(),
            state: new_state,
            attributes: new_attributes,
            last_changed,
            last_updated: now,
            context,
        }
    }

    /// The friendly_name attribute, if set to a non-empty string
    pub fn friendly_name(&self) -> Option<&str> {
        self.attributes
            .get(ATTR_FRIENDLY_NAME)
            .and_then(|v| v.as_str())
            .filter(|s| !s.trim().is_empty())
    }

    /// The unit_of_measurement attribute, if present
    pub fn unit(&self) -> Option<&str> {
        self.attributes
            .get(ATTR_UNIT_OF_MEASUREMENT)
            .and_then(|v| v.as_str())
    }

    /// This state as a history sample taken at `last_updated`
    pub fn to_sample(&self) -> Sample {
        Sample::new(self.last_updated, self.state.clone())
    }

    /// Numeric value of the state, if it parses
    pub fn numeric_value(&self) -> Option<f64> {
        self.to_sample().value()
    }
}

impl PartialEq for State {
    fn eq(&self, other: &Self) -> bool {
        // Timestamps and context are not compared
        self.entity_id == other.entity_id
            && self.state == other.state
            && self.attributes == other.attributes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn meter_state(value: &str) -> State {
        let mut attributes = HashMap::new();
        attributes.insert(ATTR_FRIENDLY_NAME.to_string(), json!("Unit 4 Total Energy"));
        attributes.insert(ATTR_UNIT_OF_MEASUREMENT.to_string(), json!("kWh"));
        State::new(
            EntityId::new("sensor.unit_4_total_energy").unwrap(),
            value,
            attributes,
            Context::new(),
        )
    }

    #[test]
    fn test_update_keeps_last_changed_for_same_value() {
        let state = meter_state("10.5");
        let same = state.with_update("10.5", state.attributes.clone(), Context::new());
        assert_eq!(same.last_changed, state.last_changed);
        assert!(same.last_updated >= state.last_updated);

        let changed = state.with_update("11.0", state.attributes.clone(), Context::new());
        assert!(changed.last_changed >= state.last_changed);
        assert_eq!(changed.state, "11.0");
    }

    #[test]
    fn test_attribute_helpers() {
        let state = meter_state("10.5");
        assert_eq!(state.friendly_name(), Some("Unit 4 Total Energy"));
        assert_eq!(state.unit(), Some("kWh"));
        assert_eq!(state.numeric_value(), Some(10.5));
        assert_eq!(meter_state("unknown").numeric_value(), None);
    }
}
