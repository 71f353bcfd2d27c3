//! Health check endpoints.
//!
//! - `/health` - liveness and version (for load balancers)
//! - `/health/pool` - pool counters

use axum::extract::Extension;
use axum::response::Json;
use axum::routing::get;
use axum::Router;
use motorpool_core::{LeaseRegistry, PoolStats};
use serde::Serialize;
use std::sync::Arc;

use super::response::ApiResponse;

/// Simple health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

async fn health_check(Extension(registry): Extension<Arc<LeaseRegistry>>) -> Json<HealthResponse> {
    let status = if registry.is_shut_down() {
        "draining"
    } else {
        "healthy"
    };
    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn pool_health(
    Extension(registry): Extension<Arc<LeaseRegistry>>,
) -> Json<ApiResponse<PoolStats>> {
    Json(ApiResponse::success(registry.stats().await))
}

/// Create health routes
pub fn health_routes() -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/health/pool", get(pool_health))
}
