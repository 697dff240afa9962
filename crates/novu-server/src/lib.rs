//! Novu hub server
//!
//! Wires the shared components (event bus, state store, service registry,
//! recorder) together, sets up the receipts integration and serves the REST
//! API.

pub mod api;
pub mod hub;

pub use api::{create_router, cors_layer, start_server, AppState};
pub use hub::Hub;
