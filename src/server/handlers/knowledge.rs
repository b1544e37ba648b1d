use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::core::errors::ApiError;
use crate::server::upload::{decode_upload, save_upload, UploadPolicy};
use crate::state::AppState;

pub async fn stats(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.knowledge.stats().await)
}

#[derive(Debug, Deserialize)]
pub struct KnowledgeUploadBody {
    pub file_name: String,
    pub file_data: String,
    #[serde(default)]
    pub file_type: Option<String>,
}

pub async fn upload(
    State(state): State<Arc<AppState>>,
    body: Result<Json<KnowledgeUploadBody>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(body) = body
        .map_err(|rejection| ApiError::BadRequest(format!("Invalid JSON body: {}", rejection)))?;

    let policy = UploadPolicy::from_config(&state.config.load_config());
    let validated = decode_upload(&body.file_name, &body.file_data, &policy)?;
    save_upload(&state.paths, &validated).await?;

    let doc_type = body.file_type.as_deref().unwrap_or("sales_doc");
    let chunks_ingested = state
        .knowledge
        .ingest(&validated.file_name, &validated.bytes, doc_type)
        .await?;

    Ok(Json(json!({
        "message": format!("Ingested {} into the knowledge base", validated.file_name),
        "file_name": validated.file_name,
        "chunks_ingested": chunks_ingested,
    })))
}
