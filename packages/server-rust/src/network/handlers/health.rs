//! Health and liveness endpoint handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde_json::json;

use super::AppState;

/// Returns basic health information as JSON.
pub async fn health_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    let uptime_secs = state.start_time.elapsed().as_secs();

    Json(json!({
        "state": "ready",
        "uptime_secs": uptime_secs,
    }))
}

/// Liveness probe -- always returns 200 OK.
pub async fn liveness_handler() -> StatusCode {
    StatusCode::OK
}
