use std::sync::Arc;

use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use serde_json::Value;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::server::handlers::{chat, health, knowledge};
use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    let cors_layer = build_cors_layer(&state);
    Router::new()
        .route("/", get(health::root))
        .route("/api/test", get(health::api_test))
        .route("/api/chat", post(chat::chat))
        .route("/api/knowledge/stats", get(knowledge::stats))
        .route("/api/knowledge/upload", post(knowledge::upload))
        .with_state(state)
        .layer(cors_layer)
        .layer(TraceLayer::new_for_http())
}

fn build_cors_layer(state: &Arc<AppState>) -> CorsLayer {
    let config = state.config.load_config();
    let allowed_origins = resolve_allowed_origins(&config)
        .into_iter()
        .filter_map(|origin| HeaderValue::from_str(&origin).ok())
        .collect::<Vec<_>>();

    let allow_origin = if allowed_origins.is_empty() {
        AllowOrigin::list(
            default_local_origins()
                .into_iter()
                .filter_map(|origin| HeaderValue::from_str(&origin).ok())
                .collect::<Vec<_>>(),
        )
    } else {
        AllowOrigin::list(allowed_origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::ACCEPT, header::CONTENT_TYPE])
}

fn resolve_allowed_origins(config: &Value) -> Vec<String> {
    config
        .get("server")
        .and_then(|server| server.get("cors_allowed_origins"))
        .and_then(|value| value.as_array())
        .map(|list| {
            list.iter()
                .filter_map(|item| item.as_str())
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(|item| item.to_string())
                .collect::<Vec<_>>()
        })
        .unwrap_or_default()
}

fn default_local_origins() -> Vec<String> {
    vec![
        "http://localhost".to_string(),
        "http://localhost:3000".to_string(),
        "http://localhost:5173".to_string(),
        "http://127.0.0.1".to_string(),
        "http://127.0.0.1:3000".to_string(),
        "http://127.0.0.1:5173".to_string(),
    ]
}
