//! Entity identifier naming a monitored quantity

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error type for rejected entity identifiers
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EntityIdError {
    #[error("entity_id cannot be empty")]
    Empty,

    #[error("entity_id cannot contain whitespace or control characters")]
    InvalidChars,
}

/// Opaque identifier of an entity (e.g., "sensor.unit_4_total_energy")
///
/// Two ids are the same entity exactly when their strings are equal. The
/// conventional `domain.object_id` split is exposed for grouping, but no
/// lookup depends on it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EntityId(String);

impl EntityId {
    /// Create an entity id, rejecting empty strings and embedded whitespace
    pub fn new(id: impl Into<String>) -> Result<Self, EntityIdError> {
        let id = id.into();
        if id.is_empty() {
            return Err(EntityIdError::Empty);
        }
        if id.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(EntityIdError::InvalidChars);
        }
        Ok(Self(id))
    }

    /// The id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The part before the first '.', if there is one
    pub fn domain(&self) -> Option<&str> {
        self.0.split_once('.').map(|(domain, _)| domain)
    }

    /// The part after the first '.', or the whole id when there is no '.'
    pub fn object_id(&self) -> &str {
        self.0
            .split_once('.')
            .map(|(_, object_id)| object_id)
            .unwrap_or(&self.0)
    }
}

impl FromStr for EntityId {
    type Err = EntityIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for EntityId {
    type Error = EntityIdError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<EntityId> for String {
    fn from(id: EntityId) -> String {
        id.0
    }
}

impl AsRef<str> for EntityId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parts() {
        let id: EntityId = "sensor.unit_4_total_energy".parse().unwrap();
        assert_eq!(id.domain(), Some("sensor"));
        assert_eq!(id.object_id(), "unit_4_total_energy");
    }

    #[test]
    fn test_opaque_ids_are_accepted() {
        // Structure is not enforced; equality is all that matters
        let id = EntityId::new("Meter-7").unwrap();
        assert_eq!(id.domain(), None);
        assert_eq!(id.object_id(), "Meter-7");
        assert_ne!(id, EntityId::new("meter-7").unwrap());
    }

    #[test]
    fn test_rejected_ids() {
        assert_eq!(EntityId::new("").unwrap_err(), EntityIdError::Empty);
        assert_eq!(
            "sensor.two words".parse::<EntityId>().unwrap_err(),
            EntityIdError::InvalidChars
        );
    }

    #[test]
    fn test_serde_as_plain_string() {
        let id = EntityId::new("sensor.kitchen_total_energy").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"sensor.kitchen_total_energy\"");

        let parsed: EntityId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, id);
        assert!(serde_json::from_str::<EntityId>("\"\"").is_err());
    }
}
