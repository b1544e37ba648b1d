use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde_json::json;

use crate::state::AppState;

pub async fn root(State(_state): State<Arc<AppState>>) -> impl IntoResponse {
    "Fleetworthy Sales Agent API is running!"
}

pub async fn api_test(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let knowledge = state.knowledge.stats().await;
    Json(json!({
        "status": "ok",
        "strategy": state.orchestrator.strategy_name(),
        "knowledge": knowledge,
        "timestamp": Utc::now().to_rfc3339(),
    }))
}
