//! Current entity states for the Novu hub
//!
//! The StateStore holds the latest state of every entity, answers the
//! "current value" questions the receipt generator falls back on, and fires
//! STATE_CHANGED on every write so the recorder can persist history.

use dashmap::DashMap;
use novu_core::events::StateChangedData;
use novu_core::{Context, CurrentStateProvider, EntityId, State};
use novu_event_bus::EventBus;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, instrument, trace};

/// Latest state of every known entity
pub struct StateStore {
    /// States keyed by entity id
    states: DashMap<EntityId, State>,
    /// Event bus for STATE_CHANGED notifications
    event_bus: Arc<EventBus>,
}

impl StateStore {
    /// Create an empty store publishing to the given bus
    pub fn new(event_bus: Arc<EventBus>) -> Self {
        Self {
            states: DashMap::new(),
            event_bus,
        }
    }

    /// Write the state of an entity and fire STATE_CHANGED
    #[instrument(skip(self, state, attributes, context), fields(entity_id = %entity_id))]
    pub fn set(
        &self,
        entity_id: EntityId,
        state: impl Into<String>,
        attributes: HashMap<String, serde_json::Value>,
        context: Context,
    ) -> State {
        let old_state = self.states.get(&entity_id).map(|s| s.clone());

        let new_state = match &old_state {
            Some(existing) => existing.with_update(state, attributes, context.clone()),
            None => State::new(entity_id.clone(), state, attributes, context.clone()),
        };

        debug!(
            state = %new_state.state,
            changed = old_state.as_ref().map(|s| s.state != new_state.state).unwrap_or(true),
            "Setting entity state"
        );

        self.states.insert(entity_id.clone(), new_state.clone());

        self.event_bus.fire_typed(
            StateChangedData {
                entity_id,
                old_state,
                new_state: Some(new_state.clone()),
            },
            context,
        );

        new_state
    }

    /// Get the current state of an entity
    pub fn get(&self, entity_id: &EntityId) -> Option<State> {
        self.states.get(entity_id).map(|s| s.clone())
    }

    /// Check whether an entity has a state
    pub fn contains(&self, entity_id: &EntityId) -> bool {
        self.states.contains_key(entity_id)
    }

    /// All states whose id starts with `domain.`
    pub fn domain_states(&self, domain: &str) -> Vec<State> {
        let mut states: Vec<State> = self
            .states
            .iter()
            .filter(|entry| entry.key().domain() == Some(domain))
            .map(|entry| entry.value().clone())
            .collect();
        states.sort_by(|a, b| a.entity_id.cmp(&b.entity_id));
        states
    }

    /// All states, ordered by entity id
    pub fn all(&self) -> Vec<State> {
        let mut states: Vec<State> = self.states.iter().map(|r| r.value().clone()).collect();
        states.sort_by(|a, b| a.entity_id.cmp(&b.entity_id));
        states
    }

    /// Remove an entity's state, firing STATE_CHANGED with no new state
    #[instrument(skip(self, context), fields(entity_id = %entity_id))]
    pub fn remove(&self, entity_id: &EntityId, context: Context) -> Option<State> {
        let old_state = self.states.remove(entity_id).map(|(_, s)| s);

        if let Some(ref state) = old_state {
            trace!("Removing entity state");
            self.event_bus.fire_typed(
                StateChangedData {
                    entity_id: entity_id.clone(),
                    old_state: Some(state.clone()),
                    new_state: None,
                },
                context,
            );
        }

        old_state
    }

    /// Number of entities with a state
    pub fn entity_count(&self) -> usize {
        self.states.len()
    }
}

impl CurrentStateProvider for StateStore {
    fn current_state(&self, entity_id: &EntityId) -> Option<State> {
        self.get(entity_id)
    }

    fn all_states(&self) -> Vec<State> {
        self.all()
    }
}

/// Thread-safe wrapper for StateStore
pub type SharedStateStore = Arc<StateStore>;

#[cfg(test)]
mod tests {
    use super::*;
    use novu_core::events::STATE_CHANGED;

    fn id(s: &str) -> EntityId {
        EntityId::new(s).unwrap()
    }

    #[tokio::test]
    async fn test_set_fires_state_changed() {
        let bus = Arc::new(EventBus::new());
        let mut rx = bus.subscribe(STATE_CHANGED);
        let store = StateStore::new(bus);

        store.set(id("sensor.unit_1_total_energy"), "10", HashMap::new(), Context::new());
        store.set(id("sensor.unit_1_total_energy"), "12", HashMap::new(), Context::new());

        let first = rx.recv().await.unwrap();
        assert!(first.data["old_state"].is_null());
        assert_eq!(first.data["new_state"]["state"], "10");

        let second = rx.recv().await.unwrap();
        assert_eq!(second.data["old_state"]["state"], "10");
        assert_eq!(second.data["new_state"]["state"], "12");
    }

    #[test]
    fn test_current_value_provider() {
        let store = StateStore::new(Arc::new(EventBus::new()));
        store.set(id("sensor.unit_1_total_energy"), "10.5", HashMap::new(), Context::new());

        assert_eq!(
            store.current_value(&id("sensor.unit_1_total_energy")).as_deref(),
            Some("10.5")
        );
        assert_eq!(store.current_value(&id("sensor.missing")), None);
    }

    #[test]
    fn test_domain_states_and_remove() {
        let store = StateStore::new(Arc::new(EventBus::new()));
        store.set(id("sensor.b"), "1", HashMap::new(), Context::new());
        store.set(id("sensor.a"), "2", HashMap::new(), Context::new());
        store.set(id("switch.a"), "on", HashMap::new(), Context::new());

        let sensors = store.domain_states("sensor");
        assert_eq!(sensors.len(), 2);
        assert_eq!(sensors[0].entity_id.as_str(), "sensor.a");

        assert!(store.remove(&id("sensor.a"), Context::new()).is_some());
        assert!(!store.contains(&id("sensor.a")));
        assert_eq!(store.entity_count(), 2);
    }
}
