//! Feeds the recorder from STATE_CHANGED events

use novu_core::events::StateChangedData;
use novu_event_bus::EventBus;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::SampleSink;

/// Record the new state of every STATE_CHANGED event into `sink`
///
/// Removals (no new state) are not recorded. The task ends when the bus is
/// dropped.
pub fn spawn_state_listener(bus: &EventBus, sink: Arc<dyn SampleSink>) -> JoinHandle<()> {
    let mut rx = bus.subscribe_typed::<StateChangedData>();

    tokio::spawn(async move {
        info!("Recorder listening for state changes");
        loop {
            match rx.recv().await {
                Ok(event) => {
                    let Some(state) = event.data.new_state else {
                        continue;
                    };
                    let sample = state.to_sample();
                    if let Err(e) = sink.record(&state.entity_id, sample).await {
                        warn!(entity_id = %state.entity_id, error = %e, "Failed to record state");
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Recorder fell behind, state changes were dropped");
                }
                Err(RecvError::Closed) => {
                    debug!("Event bus closed, recorder listener stopping");
                    break;
                }
            }
        }
    })
}
