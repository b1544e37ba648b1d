pub mod context_builder;
pub mod engine;
pub mod service;
pub mod sqlite;
pub mod store;

pub use service::{KnowledgeService, KnowledgeStats};
pub use sqlite::SqliteKnowledgeStore;
pub use store::{ChunkSearchResult, KnowledgeStore, StoredChunk};
