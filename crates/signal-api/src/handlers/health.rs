//! Health check handler

use axum::Json;
use serde_json::{json, Value};

/// Liveness probe
///
/// GET /health
pub async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
