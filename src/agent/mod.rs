pub mod fallback;
pub mod instructions;
pub mod orchestrator;
pub mod runtime;
pub mod strategy;
pub mod topic;

pub use fallback::TemplateResponder;
pub use orchestrator::{ChatQuery, ResearchOrchestrator, OUT_OF_DOMAIN_REFUSAL, SECTION_SEPARATOR};
pub use runtime::ResearchAgent;
pub use strategy::{select_strategy, AgentBacked, ResponseStrategy, TemplateFallback};
pub use topic::TopicGate;
