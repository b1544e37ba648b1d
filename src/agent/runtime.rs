//! Bounded tool-use loop for the research agent.
//!
//! Each invocation runs at most `max_steps` reasoning steps. The model either
//! returns a final answer or requests one tool call per step; tool results are
//! fed back as system messages. Hitting the cap yields a truncated-but-normal
//! result, never an error.

use serde_json::Value;
use std::sync::Arc;

use super::instructions::build_agent_instructions;
use crate::core::errors::ApiError;
use crate::llm::{ChatMessage, ChatRequest, LlmProvider};
use crate::mcp::McpManager;

const DEFAULT_MAX_STEPS: usize = 10;

enum AgentDecision {
    Final(String),
    ToolCall { name: String, args: Value },
}

#[derive(Clone)]
pub struct ResearchAgent {
    llm: Arc<dyn LlmProvider>,
    mcp: McpManager,
    max_steps: usize,
}

impl ResearchAgent {
    pub fn new(llm: Arc<dyn LlmProvider>, mcp: McpManager, max_steps: usize) -> Self {
        Self {
            llm,
            mcp,
            max_steps: if max_steps == 0 {
                DEFAULT_MAX_STEPS
            } else {
                max_steps
            },
        }
    }

    /// Runs one research task to completion or to the step cap.
    pub async fn run(&self, user_prompt: &str) -> Result<String, ApiError> {
        let tools = self.mcp.list_tools().await;
        let tool_names: Vec<String> = tools.iter().map(|tool| tool.name.clone()).collect();

        let mut messages = vec![
            ChatMessage::system(build_agent_instructions(&tool_names)),
            ChatMessage::user(user_prompt.to_string()),
        ];

        for step in 0..self.max_steps {
            let request = ChatRequest::new(messages.clone()).with_temperature(0.7);
            let response = self.llm.chat(request).await?;

            match parse_agent_decision(&response) {
                AgentDecision::Final(content) => {
                    if !content.trim().is_empty() {
                        return Ok(content.trim().to_string());
                    }
                    // Empty final: nudge once, keep looping.
                    messages.push(ChatMessage::system(
                        "Your final answer was empty. Provide the final response.",
                    ));
                }
                AgentDecision::ToolCall { name, args } => {
                    tracing::debug!("Agent step {}/{}: tool `{}`", step + 1, self.max_steps, name);

                    if !tool_names.contains(&name) {
                        messages.push(ChatMessage::system(format!(
                            "Tool `{}` is not available. Use one of: {}",
                            name,
                            tool_names.join(", ")
                        )));
                        continue;
                    }

                    messages.push(ChatMessage::assistant(response.clone()));

                    match self.mcp.execute_tool(&name, &args).await {
                        Ok(output) => {
                            let payload = format!("Tool `{}` result:\n{}", name, output);
                            messages.push(ChatMessage::system(payload));
                        }
                        Err(err) => {
                            // A single failed tool call is recoverable; the
                            // model can retry or answer without it.
                            let failure = format!("Tool `{}` failed: {}", name, err);
                            tracing::warn!("{}", failure);
                            messages.push(ChatMessage::system(failure));
                        }
                    }
                }
            }
        }

        // Step cap reached: report a normal truncated result, not an error.
        Ok(
            "I wasn't able to finish researching that in time - could you rephrase \
             or narrow down the question?"
                .to_string(),
        )
    }
}

fn parse_agent_decision(text: &str) -> AgentDecision {
    if let Some(json_value) = parse_json_from_text(text) {
        if let Some(decision) = parse_agent_decision_from_value(&json_value) {
            return decision;
        }
    }
    AgentDecision::Final(text.trim().to_string())
}

fn parse_agent_decision_from_value(value: &Value) -> Option<AgentDecision> {
    let action_type = value
        .get("type")
        .or_else(|| value.get("action"))
        .and_then(|v| v.as_str())
        .unwrap_or("");

    if action_type == "tool_call" {
        let name = value
            .get("tool_name")
            .or_else(|| value.get("name"))
            .or_else(|| value.get("tool"))
            .and_then(|v| v.as_str())?;
        let args = value
            .get("tool_args")
            .or_else(|| value.get("args"))
            .cloned()
            .unwrap_or_else(|| Value::Object(serde_json::Map::new()));
        return Some(AgentDecision::ToolCall {
            name: name.to_string(),
            args,
        });
    }

    if action_type == "final" {
        let content = value
            .get("content")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string();
        return Some(AgentDecision::Final(content));
    }

    None
}

fn parse_json_from_text(text: &str) -> Option<Value> {
    let trimmed = text.trim();
    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return Some(value);
    }

    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str::<Value>(&trimmed[start..=end]).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_a_final_answer() {
        match parse_agent_decision("Our GPS tracking saves 15% on fuel.") {
            AgentDecision::Final(content) => {
                assert_eq!(content, "Our GPS tracking saves 15% on fuel.")
            }
            _ => panic!("expected final"),
        }
    }

    #[test]
    fn json_tool_call_is_parsed() {
        let text = r#"{"type":"tool_call","tool_name":"web_search_brave_web_search","tool_args":{"query":"acme trucking"}}"#;
        match parse_agent_decision(text) {
            AgentDecision::ToolCall { name, args } => {
                assert_eq!(name, "web_search_brave_web_search");
                assert_eq!(args["query"], "acme trucking");
            }
            _ => panic!("expected tool call"),
        }
    }

    #[test]
    fn json_embedded_in_prose_is_still_parsed() {
        let text = "Sure, calling the tool now: {\"type\":\"final\",\"content\":\"done\"} thanks";
        match parse_agent_decision(text) {
            AgentDecision::Final(content) => assert_eq!(content, "done"),
            _ => panic!("expected final"),
        }
    }

    #[test]
    fn alternate_key_spellings_are_accepted() {
        let text = r#"{"action":"tool_call","tool":"fetch_fetch","args":{"url":"https://example.com"}}"#;
        match parse_agent_decision(text) {
            AgentDecision::ToolCall { name, .. } => assert_eq!(name, "fetch_fetch"),
            _ => panic!("expected tool call"),
        }
    }
}
