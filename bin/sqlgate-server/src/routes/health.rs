//! Liveness check for load balancers and orchestrators.

use std::sync::Arc;

use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Value, json};

use crate::state::AppState;

#[cfg(feature = "swagger")]
#[derive(utoipa::OpenApi)]
#[openapi(paths(get_health))]
pub struct HealthApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/health", get(get_health))
}

/// Reports the crate version. Answers even when the model provider is
/// unreachable, so a failing upstream never takes the gateway out of rotation.
#[cfg_attr(feature = "swagger", utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Gateway process is up", body = Value)
    )
))]
pub async fn get_health() -> Json<Value> {
    Json(json!({ "status": "ok", "version": env!("CARGO_PKG_VERSION") }))
}
