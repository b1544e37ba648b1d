//! Builds the retrieval context string handed to the augmentation prompt.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::store::ChunkSearchResult;
use crate::core::config::config_usize;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextBuilderConfig {
    /// Maximum number of chunks to retrieve.
    pub top_k: usize,
    /// Maximum total context length in characters.
    pub max_context_chars: usize,
}

impl Default for ContextBuilderConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            max_context_chars: 2000,
        }
    }
}

impl ContextBuilderConfig {
    pub fn from_config(config: &Value) -> Self {
        let defaults = Self::default();
        Self {
            top_k: config_usize(config, "rag.top_k", defaults.top_k).max(1),
            max_context_chars: config_usize(
                config,
                "rag.max_context_chars",
                defaults.max_context_chars,
            ),
        }
    }
}

/// Greedily pack chunks, best first, into a context string under the budget.
///
/// Whole chunks only: a chunk that would overflow the budget ends the packing
/// rather than being truncated mid-sentence.
pub fn build_context(results: &[ChunkSearchResult], config: &ContextBuilderConfig) -> String {
    let mut parts: Vec<String> = Vec::new();
    let mut current_length = 0;

    for result in results.iter().take(config.top_k) {
        let entry = format!("From {}: {}", result.chunk.source, result.chunk.content);
        if current_length + entry.len() > config.max_context_chars {
            break;
        }
        current_length += entry.len();
        parts.push(entry);
    }

    parts.join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::store::StoredChunk;

    fn result(content: &str, source: &str, score: f32) -> ChunkSearchResult {
        ChunkSearchResult {
            chunk: StoredChunk {
                chunk_id: format!("{}-{}", source, content.len()),
                content: content.to_string(),
                source: source.to_string(),
                doc_type: "sales_material".to_string(),
                chunk_index: 0,
            },
            score,
        }
    }

    #[test]
    fn packs_in_given_order_and_cites_sources() {
        let results = vec![
            result("GPS tracking overview.", "tracker.pdf", 0.9),
            result("Route planning notes.", "routes.txt", 0.7),
        ];

        let context = build_context(&results, &ContextBuilderConfig::default());
        let tracker_pos = context.find("tracker.pdf").unwrap();
        let routes_pos = context.find("routes.txt").unwrap();
        assert!(tracker_pos < routes_pos);
    }

    #[test]
    fn stops_before_a_chunk_would_exceed_the_budget() {
        let config = ContextBuilderConfig {
            top_k: 5,
            max_context_chars: 80,
        };
        let results = vec![
            result("short chunk", "a.txt", 0.9),
            result(&"y".repeat(200), "b.txt", 0.8),
            result("another short one", "c.txt", 0.7),
        ];

        let context = build_context(&results, &config);
        assert!(context.contains("short chunk"));
        // The oversized chunk ends packing; nothing after it is included
        // and no chunk is partially truncated.
        assert!(!context.contains("yyy"));
        assert!(!context.contains("c.txt"));
        assert!(context.len() <= config.max_context_chars);
    }

    #[test]
    fn respects_top_k() {
        let config = ContextBuilderConfig {
            top_k: 1,
            max_context_chars: 2000,
        };
        let results = vec![
            result("first", "a.txt", 0.9),
            result("second", "b.txt", 0.8),
        ];

        let context = build_context(&results, &config);
        assert!(context.contains("first"));
        assert!(!context.contains("second"));
    }

    #[test]
    fn empty_results_produce_empty_context() {
        assert!(build_context(&[], &ContextBuilderConfig::default()).is_empty());
    }
}
