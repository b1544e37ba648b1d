use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::provider::LlmProvider;
use super::types::ChatRequest;
use crate::core::errors::ApiError;

/// OpenAI-compatible chat/embeddings client.
///
/// Works against api.openai.com or any endpoint speaking the same wire
/// protocol (the base URL is configurable for self-hosted gateways).
#[derive(Clone)]
pub struct OpenAiProvider {
    base_url: String,
    api_key: String,
    chat_model: String,
    embedding_model: String,
    client: Client,
}

impl OpenAiProvider {
    pub fn new(
        base_url: String,
        api_key: String,
        chat_model: String,
        embedding_model: String,
    ) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            chat_model,
            embedding_model,
            client: Client::new(),
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn health_check(&self) -> Result<bool, ApiError> {
        let url = format!("{}/v1/models", self.base_url);
        let res = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await;
        match res {
            Ok(resp) => Ok(resp.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    async fn chat(&self, request: ChatRequest) -> Result<String, ApiError> {
        let url = format!("{}/v1/chat/completions", self.base_url);

        let mut body = json!({
            "model": self.chat_model,
            "messages": request.messages,
            "stream": false,
        });

        if let Some(obj) = body.as_object_mut() {
            if let Some(t) = request.temperature {
                obj.insert("temperature".to_string(), json!(t));
            }
            if let Some(t) = request.max_tokens {
                obj.insert("max_tokens".to_string(), json!(t));
            }
        }

        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(ApiError::internal)?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::Internal(format!(
                "Chat completion failed ({}): {}",
                status, text
            )));
        }

        let payload: Value = res.json().await.map_err(ApiError::internal)?;

        let content = payload["choices"][0]["message"]["content"]
            .as_str()
            .unwrap_or_default()
            .to_string();

        if content.is_empty() {
            return Err(ApiError::Internal(
                "Chat completion returned no content".to_string(),
            ));
        }

        Ok(content)
    }

    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ApiError> {
        let url = format!("{}/v1/embeddings", self.base_url);

        let body = json!({
            "model": self.embedding_model,
            "input": inputs,
        });

        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(ApiError::internal)?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::Internal(format!(
                "Embedding request failed ({}): {}",
                status, text
            )));
        }

        let payload: Value = res.json().await.map_err(ApiError::internal)?;
        let data = payload
            .get("data")
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default();

        let mut embeddings = Vec::with_capacity(data.len());
        for entry in data {
            let vector = entry
                .get("embedding")
                .and_then(|v| v.as_array())
                .map(|values| {
                    values
                        .iter()
                        .filter_map(|v| v.as_f64())
                        .map(|v| v as f32)
                        .collect::<Vec<f32>>()
                })
                .unwrap_or_default();
            embeddings.push(vector);
        }

        if embeddings.len() != inputs.len() {
            return Err(ApiError::Internal(format!(
                "Embedding count mismatch: requested {}, got {}",
                inputs.len(),
                embeddings.len()
            )));
        }

        Ok(embeddings)
    }
}
