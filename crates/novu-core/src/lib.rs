//! Core types for the Novu hub
//!
//! This crate provides the types shared by every integration: EntityId,
//! State, Sample, Event, Context and ServiceCall, plus the collaborator
//! traits through which integrations read current and historical states.

mod context;
mod entity_id;
mod event;
mod provider;
mod sample;
mod service_call;
mod state;

pub use context::Context;
pub use entity_id::{EntityId, EntityIdError};
pub use event::{Event, EventData, EventType};
pub use provider::{CurrentStateProvider, HistoryError, HistoryProvider};
pub use sample::Sample;
pub use service_call::{EntityTarget, ServiceCall, SupportsResponse};
pub use state::{State, ATTR_FRIENDLY_NAME, ATTR_UNIT_OF_MEASUREMENT};

/// State value reported by integrations that lost contact with a device
pub const STATE_UNAVAILABLE: &str = "unavailable";

/// State value reported before a device produced its first reading
pub const STATE_UNKNOWN: &str = "unknown";

/// Standard event types used across the hub
pub mod events {
    use super::*;

    /// Event type for state changes
    pub const STATE_CHANGED: &str = "state_changed";

    /// Data for STATE_CHANGED events
    #[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
    pub struct StateChangedData {
        pub entity_id: EntityId,
        pub old_state: Option<State>,
        pub new_state: Option<State>,
    }

    impl EventData for StateChangedData {
        fn event_type() -> &'static str {
            STATE_CHANGED
        }
    }
}
