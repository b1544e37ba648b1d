use async_trait::async_trait;

use super::types::ChatRequest;
use crate::core::errors::ApiError;

/// Abstract chat/embedding provider behind the research agent and the
/// knowledge augmentation path.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// provider name (e.g. "openai")
    fn name(&self) -> &str;

    /// check if the provider is reachable with the configured credentials
    async fn health_check(&self) -> Result<bool, ApiError>;

    /// chat completion (non-streaming)
    async fn chat(&self, request: ChatRequest) -> Result<String, ApiError>;

    /// generate embeddings
    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ApiError>;
}
