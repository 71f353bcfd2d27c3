//! WebSocket endpoints
//!
//! - /ws/events - pool event stream

pub mod events;

pub use events::events_handler;

use axum::{routing::get, Router};

/// Create the WebSocket router
pub fn websocket_router() -> Router {
    Router::new().route("/ws/events", get(events_handler))
}
