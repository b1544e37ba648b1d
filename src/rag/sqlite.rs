//! SQLite-backed knowledge store.
//!
//! In-process vector store using SQLite for chunk metadata and
//! brute-force cosine similarity for search. Chunks without an embedding
//! (ingested while no embedding provider was configured) are still
//! reachable through the keyword search path.

use std::path::PathBuf;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};

use super::store::{ChunkSearchResult, KnowledgeStore, StoredChunk};
use crate::core::config::AppPaths;
use crate::core::errors::ApiError;

pub struct SqliteKnowledgeStore {
    pool: SqlitePool,
}

impl SqliteKnowledgeStore {
    pub async fn new(paths: &AppPaths) -> Result<Self, ApiError> {
        Self::with_path(paths.knowledge_db_path.clone()).await
    }

    pub async fn with_path(db_path: PathBuf) -> Result<Self, ApiError> {
        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(ApiError::internal)?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), ApiError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS knowledge_chunks (
                chunk_id TEXT PRIMARY KEY,
                content TEXT NOT NULL,
                source TEXT NOT NULL DEFAULT '',
                doc_type TEXT NOT NULL DEFAULT 'sales_material',
                chunk_index INTEGER NOT NULL DEFAULT 0,
                embedding BLOB,
                created_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_knowledge_source ON knowledge_chunks(source)")
            .execute(&self.pool)
            .await
            .map_err(ApiError::internal)?;

        Ok(())
    }

    fn serialize_embedding(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    fn deserialize_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect()
    }

    fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
        if a.len() != b.len() || a.is_empty() {
            return 0.0;
        }

        let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
        let denom = norm_a * norm_b;

        if denom <= f32::EPSILON {
            0.0
        } else {
            (dot / denom).clamp(-1.0, 1.0)
        }
    }

    fn row_to_chunk(row: &sqlx::sqlite::SqliteRow) -> StoredChunk {
        let chunk_index: i64 = row.get("chunk_index");
        StoredChunk {
            chunk_id: row.get("chunk_id"),
            content: row.get("content"),
            source: row.get("source"),
            doc_type: row.get("doc_type"),
            chunk_index: chunk_index.max(0) as usize,
        }
    }
}

#[async_trait]
impl KnowledgeStore for SqliteKnowledgeStore {
    async fn insert(
        &self,
        chunk: StoredChunk,
        embedding: Option<Vec<f32>>,
    ) -> Result<(), ApiError> {
        let blob = embedding
            .as_deref()
            .map(Self::serialize_embedding)
            .unwrap_or_default();

        sqlx::query(
            "INSERT OR REPLACE INTO knowledge_chunks (chunk_id, content, source, doc_type, chunk_index, embedding)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(&chunk.chunk_id)
        .bind(&chunk.content)
        .bind(&chunk.source)
        .bind(&chunk.doc_type)
        .bind(chunk.chunk_index as i64)
        .bind(&blob)
        .execute(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        Ok(())
    }

    async fn insert_batch(
        &self,
        items: Vec<(StoredChunk, Option<Vec<f32>>)>,
    ) -> Result<(), ApiError> {
        if items.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await.map_err(ApiError::internal)?;

        for (chunk, embedding) in &items {
            let blob = embedding
                .as_deref()
                .map(Self::serialize_embedding)
                .unwrap_or_default();

            sqlx::query(
                "INSERT OR REPLACE INTO knowledge_chunks (chunk_id, content, source, doc_type, chunk_index, embedding)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )
            .bind(&chunk.chunk_id)
            .bind(&chunk.content)
            .bind(&chunk.source)
            .bind(&chunk.doc_type)
            .bind(chunk.chunk_index as i64)
            .bind(&blob)
            .execute(&mut *tx)
            .await
            .map_err(ApiError::internal)?;
        }

        tx.commit().await.map_err(ApiError::internal)?;
        Ok(())
    }

    async fn search(
        &self,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<ChunkSearchResult>, ApiError> {
        let rows = sqlx::query(
            "SELECT chunk_id, content, source, doc_type, chunk_index, embedding
             FROM knowledge_chunks",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        let mut scored: Vec<ChunkSearchResult> = rows
            .iter()
            .filter_map(|row| {
                let embedding_bytes: Vec<u8> = row.get("embedding");
                if embedding_bytes.is_empty() {
                    return None;
                }
                let stored_emb = Self::deserialize_embedding(&embedding_bytes);
                let score = Self::cosine_similarity(query_embedding, &stored_emb);

                Some(ChunkSearchResult {
                    chunk: Self::row_to_chunk(row),
                    // Cosine lands in [-1, 1]; shift into the [0, 1] relevance
                    // contract the orchestrator expects.
                    score: (score + 1.0) / 2.0,
                })
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(limit.max(1));

        Ok(scored)
    }

    async fn search_keyword(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<ChunkSearchResult>, ApiError> {
        let query_lower = query.to_lowercase();
        let query_terms: Vec<&str> = query_lower.split_whitespace().collect();
        if query_terms.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query(
            "SELECT chunk_id, content, source, doc_type, chunk_index, embedding
             FROM knowledge_chunks",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        let mut scored: Vec<ChunkSearchResult> = rows
            .iter()
            .filter_map(|row| {
                let chunk = Self::row_to_chunk(row);
                let content_lower = chunk.content.to_lowercase();
                let hits = query_terms
                    .iter()
                    .filter(|term| content_lower.contains(*term))
                    .count();
                if hits == 0 {
                    return None;
                }
                let score = hits as f32 / query_terms.len() as f32;
                Some(ChunkSearchResult { chunk, score })
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(limit.max(1));

        Ok(scored)
    }

    async fn count(&self) -> Result<usize, ApiError> {
        let row = sqlx::query("SELECT COUNT(*) AS total FROM knowledge_chunks")
            .fetch_one(&self.pool)
            .await
            .map_err(ApiError::internal)?;
        let total: i64 = row.get("total");
        Ok(total.max(0) as usize)
    }

    async fn delete_source(&self, source: &str) -> Result<usize, ApiError> {
        let result = sqlx::query("DELETE FROM knowledge_chunks WHERE source = ?1")
            .bind(source)
            .execute(&self.pool)
            .await
            .map_err(ApiError::internal)?;
        Ok(result.rows_affected() as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn temp_store() -> (tempfile::TempDir, SqliteKnowledgeStore) {
        let dir = tempdir().expect("tempdir");
        let store = SqliteKnowledgeStore::with_path(dir.path().join("knowledge.db"))
            .await
            .expect("store");
        (dir, store)
    }

    fn chunk(id: &str, content: &str, source: &str) -> StoredChunk {
        StoredChunk {
            chunk_id: id.to_string(),
            content: content.to_string(),
            source: source.to_string(),
            doc_type: "sales_material".to_string(),
            chunk_index: 0,
        }
    }

    #[tokio::test]
    async fn search_ranks_by_cosine_similarity() {
        let (_dir, store) = temp_store().await;

        store
            .insert(chunk("a", "route optimization", "doc1"), Some(vec![1.0, 0.0]))
            .await
            .unwrap();
        store
            .insert(chunk("b", "driver safety", "doc1"), Some(vec![0.0, 1.0]))
            .await
            .unwrap();

        let results = store.search(&[1.0, 0.1], 2).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].chunk.chunk_id, "a");
        assert!(results[0].score > results[1].score);
        assert!(results[0].score >= 0.0 && results[0].score <= 1.0);
    }

    #[tokio::test]
    async fn keyword_search_reaches_unembedded_chunks() {
        let (_dir, store) = temp_store().await;

        store
            .insert(chunk("a", "GPS tracking cuts fuel costs", "doc1"), None)
            .await
            .unwrap();
        store
            .insert(chunk("b", "maintenance scheduling basics", "doc1"), None)
            .await
            .unwrap();

        let results = store.search_keyword("fuel tracking", 5).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].chunk.chunk_id, "a");

        // Embedding search cannot see chunks stored without vectors.
        let empty = store.search(&[1.0, 0.0], 5).await.unwrap();
        assert!(empty.is_empty());
    }

    #[tokio::test]
    async fn count_and_delete_source() {
        let (_dir, store) = temp_store().await;

        store
            .insert_batch(vec![
                (chunk("a", "one", "doc1"), None),
                (chunk("b", "two", "doc1"), None),
                (chunk("c", "three", "doc2"), None),
            ])
            .await
            .unwrap();

        assert_eq!(store.count().await.unwrap(), 3);
        assert_eq!(store.delete_source("doc1").await.unwrap(), 2);
        assert_eq!(store.count().await.unwrap(), 1);
    }
}
