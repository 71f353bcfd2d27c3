//! Car pool endpoints
//!
//! GET  /api/v1/cars              - List every car
//! GET  /api/v1/cars/:id          - One car
//! POST /api/v1/cars/claim        - Lease the first free car
//! POST /api/v1/cars/:id/release  - Give a leased car back
//! POST /api/v1/cars/:id/busy     - Heartbeat: car in use
//! POST /api/v1/cars/:id/free     - Heartbeat: car available
//! GET  /rooms                    - Bare car list for the dashboard

use axum::{
    extract::{Extension, Path},
    routing::{get, post},
    Json, Router,
};
use motorpool_core::{Car, LeaseRegistry};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::response::{ApiResponse, ApiResult};
use crate::middleware::identity::HolderIdentity;

/// Claim request body; the whole body may be omitted
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimRequest {
    /// Requested lease in seconds; out-of-range values get the default
    #[serde(default)]
    pub ttl_seconds: Option<i64>,
}

async fn list_cars(Extension(registry): Extension<Arc<LeaseRegistry>>) -> Json<ApiResponse<Vec<Car>>> {
    Json(ApiResponse::success(registry.list().await))
}

async fn list_rooms(Extension(registry): Extension<Arc<LeaseRegistry>>) -> Json<Vec<Car>> {
    Json(registry.list().await)
}

async fn get_car(
    Path(id): Path<String>,
    Extension(registry): Extension<Arc<LeaseRegistry>>,
) -> ApiResult<Car> {
    let car = registry.get(&id).await?;
    Ok(Json(ApiResponse::success(car)))
}

async fn claim_car(
    HolderIdentity(holder): HolderIdentity,
    Extension(registry): Extension<Arc<LeaseRegistry>>,
    body: Option<Json<ClaimRequest>>,
) -> ApiResult<Car> {
    let request = body.map(|Json(req)| req).unwrap_or_default();
    let car = registry.claim(&holder, request.ttl_seconds).await?;
    Ok(Json(ApiResponse::success(car)))
}

async fn release_car(
    Path(id): Path<String>,
    HolderIdentity(holder): HolderIdentity,
    Extension(registry): Extension<Arc<LeaseRegistry>>,
) -> ApiResult<Car> {
    let car = registry.release(&holder, &id).await?;
    Ok(Json(ApiResponse::success(car)))
}

async fn mark_busy(
    Path(id): Path<String>,
    Extension(registry): Extension<Arc<LeaseRegistry>>,
) -> ApiResult<Car> {
    let car = registry.mark_busy(&id).await?;
    Ok(Json(ApiResponse::success(car)))
}

async fn mark_free(
    Path(id): Path<String>,
    Extension(registry): Extension<Arc<LeaseRegistry>>,
) -> ApiResult<Car> {
    let car = registry.mark_free(&id).await?;
    Ok(Json(ApiResponse::success(car)))
}

pub fn cars_routes() -> Router {
    Router::new()
        .route("/api/v1/cars", get(list_cars))
        .route("/api/v1/cars/claim", post(claim_car))
        .route("/api/v1/cars/:id", get(get_car))
        .route("/api/v1/cars/:id/release", post(release_car))
        .route("/api/v1/cars/:id/busy", post(mark_busy))
        .route("/api/v1/cars/:id/free", post(mark_free))
        .route("/rooms", get(list_rooms))
}
