use axum::{Json, extract::State, response::IntoResponse};
use std::sync::Arc;

use crate::state::AppState;

// health handler, includes the last peer probe when a peer is configured
pub async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let peer = state.peer_health.as_ref().map(|health| health.status());
    Json(serde_json::json!({
        "status": "healthy",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "peer": peer,
    }))
}
