use std::env;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::agent::{select_strategy, ResearchOrchestrator};
use crate::core::config::{config_str, config_usize, AppPaths, ConfigService};
use crate::llm::{LlmProvider, OpenAiProvider};
use crate::mcp::McpManager;
use crate::rag::{KnowledgeService, SqliteKnowledgeStore};

#[derive(Clone)]
pub struct AppState {
    pub paths: Arc<AppPaths>,
    pub config: ConfigService,
    pub mcp: McpManager,
    pub knowledge: Arc<KnowledgeService>,
    pub orchestrator: Arc<ResearchOrchestrator>,
    #[allow(dead_code)]
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub async fn initialize(paths: Arc<AppPaths>) -> anyhow::Result<Arc<Self>> {
        let config_service = ConfigService::new(paths.clone());
        let config = config_service.load_config();

        let mcp = McpManager::new(paths.clone());
        if let Err(err) = mcp.initialize(&config).await {
            tracing::warn!("Failed to initialize MCP tool servers: {}", err);
        }

        let llm = build_llm_provider(&config);

        let store = Arc::new(SqliteKnowledgeStore::new(&paths).await?);
        let knowledge = Arc::new(KnowledgeService::new(store, llm.clone(), &config));

        let max_steps = config_usize(&config, "agent.max_steps", 10);
        let strategy = select_strategy(llm, &mcp, max_steps).await;
        let orchestrator = Arc::new(ResearchOrchestrator::new(
            &config,
            strategy,
            knowledge.clone(),
        ));

        Ok(Arc::new(AppState {
            paths,
            config: config_service,
            mcp,
            knowledge,
            orchestrator,
            started_at: Utc::now(),
        }))
    }
}

/// The provider is optional: without an API key the server still runs, with
/// template responses and keyword-only knowledge search.
fn build_llm_provider(config: &Value) -> Option<Arc<dyn LlmProvider>> {
    let api_key = config_str(config, "llm.api_key")
        .map(|key| key.to_string())
        .or_else(|| env::var("OPENAI_API_KEY").ok().filter(|key| !key.trim().is_empty()))?;

    let base_url = config_str(config, "llm.base_url")
        .unwrap_or("https://api.openai.com")
        .to_string();
    let chat_model = config_str(config, "llm.chat_model")
        .unwrap_or("gpt-4o-mini")
        .to_string();
    let embedding_model = config_str(config, "llm.embedding_model")
        .unwrap_or("text-embedding-3-small")
        .to_string();

    Some(Arc::new(OpenAiProvider::new(
        base_url,
        api_key,
        chat_model,
        embedding_model,
    )))
}
