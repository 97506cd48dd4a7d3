//! Health endpoint.

use axum::extract::State;
use axum::Json;
use serde_json::json;

use super::AppState;

/// Reports liveness, mounted page count, uptime and the page load timeout.
pub async fn health_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "pages": state.pages.len(),
        "uptime_secs": state.start_time.elapsed().as_secs(),
        "request_timeout_secs": state.config.request_timeout.as_secs(),
    }))
}
