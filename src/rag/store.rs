//! KnowledgeStore trait — abstract interface for the sales knowledge base.
//!
//! The orchestration core only sees this contract; the concrete backend
//! (SQLite with brute-force cosine) lives in the `sqlite` module.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::errors::ApiError;

/// A stored knowledge chunk with metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredChunk {
    /// Unique chunk identifier.
    pub chunk_id: String,
    /// The text content of the chunk.
    pub content: String,
    /// Source document name (e.g. uploaded file name).
    pub source: String,
    /// Document type label (e.g. "sales_material").
    pub doc_type: String,
    /// Chunk index within the source document.
    pub chunk_index: usize,
}

/// Result of a similarity search. Score is normalized to [0, 1].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkSearchResult {
    pub chunk: StoredChunk,
    pub score: f32,
}

/// Abstract trait for knowledge base backends.
#[async_trait]
pub trait KnowledgeStore: Send + Sync {
    /// Insert a chunk, optionally with its embedding vector.
    async fn insert(&self, chunk: StoredChunk, embedding: Option<Vec<f32>>)
        -> Result<(), ApiError>;

    /// Insert multiple chunks in batch.
    async fn insert_batch(
        &self,
        items: Vec<(StoredChunk, Option<Vec<f32>>)>,
    ) -> Result<(), ApiError>;

    /// Search for chunks similar to the query embedding, ranked descending.
    async fn search(
        &self,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<ChunkSearchResult>, ApiError>;

    /// Keyword-overlap search used when no embedding provider is configured.
    async fn search_keyword(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<ChunkSearchResult>, ApiError>;

    /// Total number of stored chunks.
    async fn count(&self) -> Result<usize, ApiError>;

    /// Delete every chunk belonging to a source document.
    async fn delete_source(&self, source: &str) -> Result<usize, ApiError>;
}
