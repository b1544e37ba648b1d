//! Knowledge base service: ingestion, retrieval, and best-effort answer
//! augmentation over the injected store.

use std::sync::Arc;

use serde_json::Value;
use uuid::Uuid;

use super::context_builder::{build_context, ContextBuilderConfig};
use super::engine::{chunk_text, extract_text, ChunkingConfig};
use super::store::{ChunkSearchResult, KnowledgeStore, StoredChunk};
use crate::core::errors::ApiError;
use crate::llm::{ChatMessage, ChatRequest, LlmProvider};

const AUGMENT_SYSTEM_PROMPT: &str = "You are a friendly Fleetworthy sales agent. \
Use the provided company knowledge and research to give helpful, conversational \
responses about Fleetworthy's services. Keep responses to 2-4 sentences and focus \
on specific benefits that match the customer's needs.";

pub struct KnowledgeService {
    store: Arc<dyn KnowledgeStore>,
    llm: Option<Arc<dyn LlmProvider>>,
    chunking: ChunkingConfig,
    context: ContextBuilderConfig,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct KnowledgeStats {
    pub total_chunks: usize,
    pub status: String,
}

impl KnowledgeService {
    pub fn new(
        store: Arc<dyn KnowledgeStore>,
        llm: Option<Arc<dyn LlmProvider>>,
        config: &Value,
    ) -> Self {
        Self {
            store,
            llm,
            chunking: ChunkingConfig::from_config(config),
            context: ContextBuilderConfig::from_config(config),
        }
    }

    /// Ingest a document into the knowledge base.
    ///
    /// Returns the number of chunks stored; zero means the format carried no
    /// extractable text. Re-uploading a document replaces its previous chunks.
    pub async fn ingest(
        &self,
        file_name: &str,
        bytes: &[u8],
        doc_type: &str,
    ) -> Result<usize, ApiError> {
        let Some(text) = extract_text(file_name, bytes)? else {
            tracing::warn!("No text extracted from {}", file_name);
            return Ok(0);
        };

        let chunks = chunk_text(&text, &self.chunking);
        if chunks.is_empty() {
            return Ok(0);
        }

        let embeddings = match &self.llm {
            Some(llm) => match llm.embed(&chunks).await {
                Ok(vectors) => vectors.into_iter().map(Some).collect(),
                Err(err) => {
                    tracing::warn!(
                        "Embedding failed for {}; storing chunks without vectors: {}",
                        file_name,
                        err
                    );
                    vec![None; chunks.len()]
                }
            },
            None => vec![None; chunks.len()],
        };

        self.store.delete_source(file_name).await?;

        let items: Vec<(StoredChunk, Option<Vec<f32>>)> = chunks
            .into_iter()
            .zip(embeddings)
            .enumerate()
            .map(|(index, (content, embedding))| {
                (
                    StoredChunk {
                        chunk_id: format!("{}_{}_{}", file_name, index, Uuid::new_v4()),
                        content,
                        source: file_name.to_string(),
                        doc_type: doc_type.to_string(),
                        chunk_index: index,
                    },
                    embedding,
                )
            })
            .collect();

        let stored = items.len();
        self.store.insert_batch(items).await?;
        tracing::info!("Added {} chunks from {} to knowledge base", stored, file_name);
        Ok(stored)
    }

    /// Top-K retrieval for a query, embedding-based when possible, keyword
    /// overlap otherwise.
    pub async fn search(&self, query: &str) -> Result<Vec<ChunkSearchResult>, ApiError> {
        if let Some(llm) = &self.llm {
            match llm.embed(&[query.to_string()]).await {
                Ok(mut vectors) if !vectors.is_empty() => {
                    let query_embedding = vectors.remove(0);
                    return self.store.search(&query_embedding, self.context.top_k).await;
                }
                Ok(_) => {}
                Err(err) => {
                    tracing::warn!("Query embedding failed, using keyword search: {}", err);
                }
            }
        }
        self.store.search_keyword(query, self.context.top_k).await
    }

    /// Retrieved context for a query, bounded by the character budget.
    pub async fn relevant_context(&self, query: &str) -> Result<String, ApiError> {
        let results = self.search(query).await?;
        Ok(build_context(&results, &self.context))
    }

    /// Merge a base answer with retrieved knowledge through one completion
    /// call. Strictly best-effort: any failure returns `base_answer` unchanged.
    pub async fn augment(&self, question: &str, base_answer: &str) -> String {
        let context = match self.relevant_context(question).await {
            Ok(context) => context,
            Err(err) => {
                tracing::warn!("Knowledge retrieval failed, skipping augmentation: {}", err);
                return base_answer.to_string();
            }
        };

        if context.is_empty() {
            return base_answer.to_string();
        }

        let Some(llm) = &self.llm else {
            return base_answer.to_string();
        };

        let user_prompt = format!(
            "Question: {}\n\nFleetworthy company knowledge:\n{}\n\nResearch context:\n{}\n\n\
             Please provide a helpful, conversational response about how Fleetworthy can help.",
            question, context, base_answer
        );

        let request = ChatRequest::new(vec![
            ChatMessage::system(AUGMENT_SYSTEM_PROMPT),
            ChatMessage::user(user_prompt),
        ])
        .with_temperature(0.7)
        .with_max_tokens(200);

        match llm.chat(request).await {
            Ok(merged) if !merged.trim().is_empty() => merged.trim().to_string(),
            Ok(_) => base_answer.to_string(),
            Err(err) => {
                tracing::warn!("Augmentation completion failed: {}", err);
                base_answer.to_string()
            }
        }
    }

    pub async fn stats(&self) -> KnowledgeStats {
        match self.store.count().await {
            Ok(total_chunks) => KnowledgeStats {
                total_chunks,
                status: if total_chunks > 0 { "ready" } else { "empty" }.to_string(),
            },
            Err(err) => {
                tracing::warn!("Knowledge stats unavailable: {}", err);
                KnowledgeStats {
                    total_chunks: 0,
                    status: "error".to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::sqlite::SqliteKnowledgeStore;
    use async_trait::async_trait;
    use serde_json::json;
    use tempfile::tempdir;

    struct FailingStore;

    #[async_trait]
    impl KnowledgeStore for FailingStore {
        async fn insert(&self, _: StoredChunk, _: Option<Vec<f32>>) -> Result<(), ApiError> {
            Err(ApiError::Internal("store down".to_string()))
        }
        async fn insert_batch(
            &self,
            _: Vec<(StoredChunk, Option<Vec<f32>>)>,
        ) -> Result<(), ApiError> {
            Err(ApiError::Internal("store down".to_string()))
        }
        async fn search(&self, _: &[f32], _: usize) -> Result<Vec<ChunkSearchResult>, ApiError> {
            Err(ApiError::Internal("store down".to_string()))
        }
        async fn search_keyword(
            &self,
            _: &str,
            _: usize,
        ) -> Result<Vec<ChunkSearchResult>, ApiError> {
            Err(ApiError::Internal("store down".to_string()))
        }
        async fn count(&self) -> Result<usize, ApiError> {
            Err(ApiError::Internal("store down".to_string()))
        }
        async fn delete_source(&self, _: &str) -> Result<usize, ApiError> {
            Err(ApiError::Internal("store down".to_string()))
        }
    }

    #[tokio::test]
    async fn augment_returns_base_when_store_fails() {
        let service = KnowledgeService::new(Arc::new(FailingStore), None, &json!({}));
        let base = "Our route optimization saves 15% on fuel.";
        assert_eq!(service.augment("fuel costs?", base).await, base);
    }

    #[tokio::test]
    async fn augment_returns_base_without_llm() {
        let dir = tempdir().unwrap();
        let store = Arc::new(
            SqliteKnowledgeStore::with_path(dir.path().join("kb.db"))
                .await
                .unwrap(),
        );
        let service = KnowledgeService::new(store, None, &json!({}));

        service
            .ingest("intro.txt", b"Fleetworthy offers GPS tracking for trucks.", "sales_material")
            .await
            .unwrap();

        // Context exists but there is no completion provider to merge it.
        let base = "base answer";
        assert_eq!(service.augment("GPS tracking", base).await, base);
    }

    #[tokio::test]
    async fn ingest_and_keyword_retrieval_round_trip() {
        let dir = tempdir().unwrap();
        let store = Arc::new(
            SqliteKnowledgeStore::with_path(dir.path().join("kb.db"))
                .await
                .unwrap(),
        );
        let service = KnowledgeService::new(store, None, &json!({}));

        let stored = service
            .ingest(
                "fleet.txt",
                b"Route optimization reduces fuel spend. Maintenance scheduling avoids downtime.",
                "sales_material",
            )
            .await
            .unwrap();
        assert!(stored >= 1);

        let context = service.relevant_context("fuel optimization").await.unwrap();
        assert!(context.contains("fleet.txt"));
        assert!(context.contains("Route optimization"));

        let stats = service.stats().await;
        assert_eq!(stats.status, "ready");
        assert_eq!(stats.total_chunks, stored);
    }

    #[tokio::test]
    async fn reingest_replaces_previous_chunks() {
        let dir = tempdir().unwrap();
        let store = Arc::new(
            SqliteKnowledgeStore::with_path(dir.path().join("kb.db"))
                .await
                .unwrap(),
        );
        let service = KnowledgeService::new(store, None, &json!({}));

        service
            .ingest("doc.txt", b"old content about dispatch", "sales_material")
            .await
            .unwrap();
        service
            .ingest("doc.txt", b"new content about compliance", "sales_material")
            .await
            .unwrap();

        let stats = service.stats().await;
        assert_eq!(stats.total_chunks, 1);

        let context = service.relevant_context("compliance").await.unwrap();
        assert!(context.contains("new content"));
    }
}
