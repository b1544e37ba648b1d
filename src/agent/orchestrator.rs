//! The question-answering pipeline: topic gate, optional company research,
//! question research, knowledge augmentation, and response assembly.

use std::sync::Arc;

use serde_json::Value;

use super::fallback::TemplateResponder;
use super::strategy::ResponseStrategy;
use super::topic::TopicGate;
use crate::rag::KnowledgeService;

/// Returned unchanged for every out-of-domain question, before any
/// collaborator call is made.
pub const OUT_OF_DOMAIN_REFUSAL: &str = "I'm here to help with questions about \
Fleetworthy's fleet management solutions! Ask me anything about GPS tracking, \
route optimization, fuel savings, driver safety, maintenance, or compliance for \
your fleet.";

/// Separator between the question answer and the company research section.
pub const SECTION_SEPARATOR: &str = "\n\n─── Company Research ───\n\n";

/// Request-scoped inputs to the pipeline.
#[derive(Debug, Clone, Default)]
pub struct ChatQuery {
    pub question: String,
    pub company_website: Option<String>,
    pub company_description: Option<String>,
}

impl ChatQuery {
    fn has_company_context(&self) -> bool {
        fn present(value: &Option<String>) -> bool {
            value
                .as_deref()
                .map(|v| !v.trim().is_empty())
                .unwrap_or(false)
        }
        present(&self.company_website) || present(&self.company_description)
    }
}

pub struct ResearchOrchestrator {
    gate: TopicGate,
    strategy: Arc<dyn ResponseStrategy>,
    responder: TemplateResponder,
    knowledge: Arc<KnowledgeService>,
}

impl ResearchOrchestrator {
    pub fn new(
        config: &Value,
        strategy: Arc<dyn ResponseStrategy>,
        knowledge: Arc<KnowledgeService>,
    ) -> Self {
        Self {
            gate: TopicGate::from_config(config),
            strategy,
            responder: TemplateResponder::new(),
            knowledge,
        }
    }

    pub fn strategy_name(&self) -> &str {
        self.strategy.name()
    }

    /// Answers one question. Never fails: every collaborator failure is
    /// recovered per call by substituting the template responder's text.
    pub async fn answer(&self, query: &ChatQuery) -> String {
        if !self.gate.is_in_domain(&query.question) {
            return OUT_OF_DOMAIN_REFUSAL.to_string();
        }

        let website = query.company_website.as_deref();
        let description = query.company_description.as_deref();

        let company_research = if query.has_company_context() {
            let text = match self.strategy.research_company(website, description).await {
                Ok(text) => text,
                Err(err) => {
                    tracing::warn!("Company research failed, using template: {}", err);
                    self.responder.company_fallback(website, description)
                }
            };
            Some(text)
        } else {
            None
        };

        let question_answer = match self
            .strategy
            .research_question(&query.question, website, description)
            .await
        {
            Ok(text) => text,
            Err(err) => {
                tracing::warn!("Question research failed, using template: {}", err);
                self.responder.question_fallback(&query.question, website)
            }
        };

        // Best-effort: returns the base answer untouched on any failure.
        let question_answer = self.knowledge.augment(&query.question, &question_answer).await;

        match company_research {
            Some(company) => format!("{}{}{}", question_answer, SECTION_SEPARATOR, company),
            None => question_answer,
        }
    }
}
