//! Typed broadcast event bus for the Novu hub
//!
//! Integrations publish what happened (a state changed, a receipt was
//! written) and anything interested subscribes: the recorder listens to
//! `state_changed`, the panel listens to `pdf_generator_complete`.

use dashmap::DashMap;
use novu_core::{Context, Event, EventData, EventType};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, trace, warn};

/// Default channel capacity for each event type
const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

type JsonEvent = Event<serde_json::Value>;

/// The event bus for publishing and subscribing to events
pub struct EventBus {
    /// One broadcast channel per event type
    channels: DashMap<EventType, broadcast::Sender<JsonEvent>>,
    /// Channel receiving every event regardless of type
    all: broadcast::Sender<JsonEvent>,
    capacity: usize,
}

impl EventBus {
    /// Create a new event bus
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a new event bus with the given per-type channel capacity
    pub fn with_capacity(capacity: usize) -> Self {
        let (all, _) = broadcast::channel(capacity);
        Self {
            channels: DashMap::new(),
            all,
            capacity,
        }
    }

    fn sender(&self, event_type: EventType) -> broadcast::Sender<JsonEvent> {
        self.channels
            .entry(event_type)
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .clone()
    }

    /// Subscribe to events of one type
    pub fn subscribe(&self, event_type: impl Into<EventType>) -> broadcast::Receiver<JsonEvent> {
        let event_type = event_type.into();
        trace!(event_type = %event_type, "Subscribing to event type");
        self.sender(event_type).subscribe()
    }

    /// Subscribe to every event
    pub fn subscribe_all(&self) -> broadcast::Receiver<JsonEvent> {
        self.all.subscribe()
    }

    /// Subscribe to a typed event, receiving parsed payloads
    pub fn subscribe_typed<T: EventData + DeserializeOwned>(&self) -> TypedEventReceiver<T> {
        TypedEventReceiver {
            rx: self.subscribe(T::event_type()),
            _phantom: PhantomData,
        }
    }

    /// Fire an event to its type's subscribers and to subscribe_all receivers
    pub fn fire(&self, event: JsonEvent) {
        debug!(event_type = %event.event_type, "Firing event");

        if let Some(sender) = self.channels.get(&event.event_type) {
            // A send error only means nobody is listening
            let _ = sender.send(event.clone());
        }
        let _ = self.all.send(event);
    }

    /// Fire a typed event
    pub fn fire_typed<T: EventData + Serialize>(&self, data: T, context: Context) {
        let event = Event::typed(data, context);
        match serde_json::to_value(&event.data) {
            Ok(json) => self.fire(event.map(|_| json)),
            Err(e) => warn!(event_type = %event.event_type, error = %e, "Dropping unserializable event"),
        }
    }

    /// Number of event types with a channel
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// A receiver that yields only events whose data parses as `T`
pub struct TypedEventReceiver<T> {
    rx: broadcast::Receiver<JsonEvent>,
    _phantom: PhantomData<T>,
}

impl<T: EventData + DeserializeOwned> TypedEventReceiver<T> {
    /// Receive the next event whose payload deserializes as `T`
    pub async fn recv(&mut self) -> Result<Event<T>, broadcast::error::RecvError> {
        loop {
            let event = self.rx.recv().await?;
            if let Ok(data) = serde_json::from_value::<T>(event.data.clone()) {
                return Ok(event.map(|_| data));
            }
        }
    }
}

/// Thread-safe wrapper for EventBus
pub type SharedEventBus = Arc<EventBus>;
