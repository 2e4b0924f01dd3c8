use crate::state::AppState;
use axum::{extract::State, response::IntoResponse, Json};

// ============================================================================
// Health endpoints
// ============================================================================

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": if state.engine.is_shutting_down() { "shutting_down" } else { "ok" },
        "active_connections": state.engine.active_connections(),
        "observers": state.engine.observer_count(),
    }))
}

// ============================================================================
// Metrics endpoint
// ============================================================================

/// Prometheus text exposition; empty when no recorder is installed
pub async fn metrics(State(state): State<AppState>) -> String {
    state
        .metrics
        .as_ref()
        .map(|handle| handle.render())
        .unwrap_or_default()
}
