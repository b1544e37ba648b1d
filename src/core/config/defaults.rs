use serde_json::{json, Value};

/// In-memory default configuration, used when no `config.yml` is present.
///
/// All tuning constants here are deliberate defaults, not invariants; deployments
/// override them through `config.yml` / `secrets.yml`.
pub fn default_config() -> Value {
    json!({
        "server": {
            "port": 5000,
            "cors_allowed_origins": []
        },
        "agent": {
            "max_steps": 10,
            "session_id": "default"
        },
        "llm": {
            "base_url": "https://api.openai.com",
            "chat_model": "gpt-4o-mini",
            "embedding_model": "text-embedding-3-small",
            "api_key": null
        },
        "tools": {
            "brave_api_key": null
        },
        "rag": {
            "chunk_size": 500,
            "chunk_overlap": 50,
            "top_k": 5,
            "max_context_chars": 2000
        },
        "uploads": {
            "max_bytes": 10 * 1024 * 1024,
            "allowed_extensions": ["pdf", "txt", "md", "doc", "docx"]
        }
    })
}
