//! Web API module for Motorpool
//!
//! Provides REST endpoints for:
//! - Car listing and lease operations
//! - Car heartbeats
//! - Health and pool counters
//! - The Server-Sent Events feed

pub mod cars;
pub mod events;
pub mod health;
pub mod response;

use std::sync::Arc;

use axum::{Extension, Router};
use motorpool_core::{LeaseRegistry, ShutdownController};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use cars::cars_routes;
pub use events::events_routes;
pub use health::health_routes;
pub use response::{ApiError, ApiResponse};

use crate::server::config::EventsConfig;
use crate::websocket::websocket_router;

/// Build the full application router with shared state attached.
pub fn app_router(
    registry: Arc<LeaseRegistry>,
    shutdown: Arc<ShutdownController>,
    events: EventsConfig,
) -> Router {
    Router::new()
        .merge(health_routes())
        .merge(cars_routes())
        .merge(events_routes())
        .merge(websocket_router())
        .layer(Extension(registry))
        .layer(Extension(shutdown))
        .layer(Extension(events))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
