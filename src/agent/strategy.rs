//! Response strategy selection.
//!
//! The availability switch is a trait with two implementations chosen once at
//! process start by a capability probe, instead of per-call conditionals: the
//! agent-backed strategy when an LLM and tool servers are configured, the
//! template strategy otherwise.

use std::sync::Arc;

use async_trait::async_trait;

use super::fallback::TemplateResponder;
use super::instructions::{company_research_prompt, question_research_prompt};
use super::runtime::ResearchAgent;
use crate::core::errors::ApiError;
use crate::llm::LlmProvider;
use crate::mcp::McpManager;

/// One research call per method; both may suspend on collaborator I/O.
#[async_trait]
pub trait ResponseStrategy: Send + Sync {
    /// strategy name for status reporting ("agent" or "template")
    fn name(&self) -> &str;

    async fn research_company(
        &self,
        website: Option<&str>,
        description: Option<&str>,
    ) -> Result<String, ApiError>;

    async fn research_question(
        &self,
        question: &str,
        company_website: Option<&str>,
        company_description: Option<&str>,
    ) -> Result<String, ApiError>;
}

/// Strategy that drives the MCP-backed research agent.
pub struct AgentBacked {
    agent: ResearchAgent,
}

impl AgentBacked {
    pub fn new(llm: Arc<dyn LlmProvider>, mcp: McpManager, max_steps: usize) -> Self {
        Self {
            agent: ResearchAgent::new(llm, mcp, max_steps),
        }
    }
}

#[async_trait]
impl ResponseStrategy for AgentBacked {
    fn name(&self) -> &str {
        "agent"
    }

    async fn research_company(
        &self,
        website: Option<&str>,
        description: Option<&str>,
    ) -> Result<String, ApiError> {
        let prompt = company_research_prompt(website.unwrap_or(""), description.unwrap_or(""));
        self.agent.run(&prompt).await
    }

    async fn research_question(
        &self,
        question: &str,
        company_website: Option<&str>,
        company_description: Option<&str>,
    ) -> Result<String, ApiError> {
        let prompt = question_research_prompt(question, company_website, company_description);
        self.agent.run(&prompt).await
    }
}

/// Strategy that answers from the deterministic templates. Never fails.
pub struct TemplateFallback {
    responder: TemplateResponder,
}

impl TemplateFallback {
    pub fn new() -> Self {
        Self {
            responder: TemplateResponder::new(),
        }
    }
}

impl Default for TemplateFallback {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResponseStrategy for TemplateFallback {
    fn name(&self) -> &str {
        "template"
    }

    async fn research_company(
        &self,
        website: Option<&str>,
        description: Option<&str>,
    ) -> Result<String, ApiError> {
        Ok(self.responder.company_fallback(website, description))
    }

    async fn research_question(
        &self,
        question: &str,
        company_website: Option<&str>,
        _company_description: Option<&str>,
    ) -> Result<String, ApiError> {
        Ok(self.responder.question_fallback(question, company_website))
    }
}

/// Capability probe, run once at startup: the agent strategy needs a chat
/// provider and at least one connected tool server.
pub async fn select_strategy(
    llm: Option<Arc<dyn LlmProvider>>,
    mcp: &McpManager,
    max_steps: usize,
) -> Arc<dyn ResponseStrategy> {
    match llm {
        Some(llm) if mcp.connected_count().await > 0 => {
            tracing::info!("Research agent enabled (LLM + MCP tool servers available)");
            Arc::new(AgentBacked::new(llm, mcp.clone(), max_steps))
        }
        Some(_) => {
            tracing::warn!("No MCP tool servers connected; using template responses");
            Arc::new(TemplateFallback::new())
        }
        None => {
            tracing::warn!("No LLM credentials configured; using template responses");
            Arc::new(TemplateFallback::new())
        }
    }
}
