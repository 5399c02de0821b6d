//! HTTP handlers for notekeeper-api.

pub mod auth;
pub mod notes;

use axum::Json;
use serde_json::json;

/// Liveness probe.
///
/// GET /health
pub async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}
