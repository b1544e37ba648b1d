use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::agent::ChatQuery;
use crate::core::errors::ApiError;
use crate::server::upload::{decode_upload, save_upload, UploadPolicy};
use crate::state::AppState;

#[derive(Debug, Deserialize, Default)]
pub struct ChatBody {
    #[serde(default)]
    pub question: Option<String>,
    #[serde(default)]
    pub company_website: Option<String>,
    #[serde(default)]
    pub company_description: Option<String>,
    #[serde(default)]
    pub file_data: Option<String>,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub file_type: Option<String>,
}

pub async fn chat(
    State(state): State<Arc<AppState>>,
    body: Result<Json<ChatBody>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(body) = body
        .map_err(|rejection| ApiError::BadRequest(format!("Invalid JSON body: {}", rejection)))?;

    let question = body
        .question
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Question is required".to_string()))?
        .to_string();

    let company_website = normalized_website(body.company_website.as_deref())?;

    let file_received = match (&body.file_data, &body.file_name) {
        (Some(data), Some(name)) => Some(receive_file(&state, name, data, &body.file_type).await?),
        (Some(_), None) => {
            return Err(ApiError::BadRequest(
                "file_name is required when file_data is provided".to_string(),
            ))
        }
        _ => None,
    };

    let query = ChatQuery {
        question,
        company_website,
        company_description: body
            .company_description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty()),
    };
    let message = state.orchestrator.answer(&query).await;

    Ok(Json(json!({
        "message": message,
        "file_received": file_received.unwrap_or(Value::Null),
    })))
}

fn normalized_website(raw: Option<&str>) -> Result<Option<String>, ApiError> {
    let Some(website) = raw.map(str::trim).filter(|w| !w.is_empty()) else {
        return Ok(None);
    };
    if !website.starts_with("http://") && !website.starts_with("https://") {
        return Err(ApiError::BadRequest(
            "company_website must start with http:// or https://".to_string(),
        ));
    }
    Ok(Some(website.to_string()))
}

/// Saves the attachment and ingests it into the knowledge store. Ingestion is
/// best-effort here: a document the extractor cannot read still counts as
/// received.
async fn receive_file(
    state: &AppState,
    file_name: &str,
    file_data: &str,
    file_type: &Option<String>,
) -> Result<Value, ApiError> {
    let policy = UploadPolicy::from_config(&state.config.load_config());
    let upload = decode_upload(file_name, file_data, &policy)?;
    save_upload(&state.paths, &upload).await?;

    let doc_type = file_type.as_deref().unwrap_or("sales_doc");
    let ingested_chunks = match state
        .knowledge
        .ingest(&upload.file_name, &upload.bytes, doc_type)
        .await
    {
        Ok(count) => count,
        Err(err) => {
            tracing::warn!("Could not ingest uploaded file {}: {}", upload.file_name, err);
            0
        }
    };

    Ok(json!({
        "file_name": upload.file_name,
        "size_bytes": upload.bytes.len(),
        "ingested_chunks": ingested_chunks,
    }))
}
