//! Document ingestion: text extraction and chunking.
//!
//! Mirrors the knowledge base's ingestion contract: documents are split into
//! overlapping word windows before embedding, so retrieval granularity stays
//! stable regardless of source format.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::config::config_usize;
use crate::core::errors::ApiError;

/// Chunking configuration. The 500/50 defaults are tuning choices carried from
/// the original deployment, not correctness requirements.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Chunk size in words.
    pub chunk_size: usize,
    /// Overlap between consecutive chunks, in words.
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            chunk_overlap: 50,
        }
    }
}

impl ChunkingConfig {
    pub fn from_config(config: &Value) -> Self {
        let defaults = Self::default();
        Self {
            chunk_size: config_usize(config, "rag.chunk_size", defaults.chunk_size).max(1),
            chunk_overlap: config_usize(config, "rag.chunk_overlap", defaults.chunk_overlap),
        }
    }
}

/// Extract plain text from an uploaded document.
///
/// Plain text and markdown pass through; PDFs go through pdf-extract. Binary
/// word-processor formats are stored on disk but yield no indexable text.
pub fn extract_text(file_name: &str, bytes: &[u8]) -> Result<Option<String>, ApiError> {
    let extension = file_extension(file_name);

    match extension.as_str() {
        "txt" | "md" => {
            let text = String::from_utf8_lossy(bytes).to_string();
            Ok(non_empty(text))
        }
        "pdf" => {
            let text = pdf_extract::extract_text_from_mem(bytes)
                .map_err(|err| ApiError::Internal(format!("PDF extraction failed: {}", err)))?;
            Ok(non_empty(text))
        }
        _ => Ok(None),
    }
}

pub fn file_extension(file_name: &str) -> String {
    file_name
        .rsplit('.')
        .next()
        .filter(|ext| *ext != file_name)
        .unwrap_or("")
        .to_lowercase()
}

/// Split text into overlapping word windows.
pub fn chunk_text(text: &str, config: &ChunkingConfig) -> Vec<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() {
        return Vec::new();
    }

    let step = config.chunk_size.saturating_sub(config.chunk_overlap).max(1);
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < words.len() {
        let end = (start + config.chunk_size).min(words.len());
        let chunk = words[start..end].join(" ");
        if !chunk.trim().is_empty() {
            chunks.push(chunk);
        }
        if end == words.len() {
            break;
        }
        start += step;
    }

    chunks
}

fn non_empty(text: String) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunks_overlap_and_cover_the_whole_text() {
        let config = ChunkingConfig {
            chunk_size: 10,
            chunk_overlap: 3,
        };
        let words: Vec<String> = (0..25).map(|i| format!("w{}", i)).collect();
        let text = words.join(" ");

        let chunks = chunk_text(&text, &config);
        assert!(chunks.len() >= 3);
        assert!(chunks[0].starts_with("w0"));
        assert!(chunks.last().unwrap().ends_with("w24"));

        // Consecutive chunks share the overlap region.
        assert!(chunks[0].ends_with("w9"));
        assert!(chunks[1].starts_with("w7"));
    }

    #[test]
    fn short_text_yields_a_single_chunk() {
        let chunks = chunk_text("just a few words", &ChunkingConfig::default());
        assert_eq!(chunks, vec!["just a few words".to_string()]);
    }

    #[test]
    fn empty_text_yields_no_chunks() {
        assert!(chunk_text("   \n\t ", &ChunkingConfig::default()).is_empty());
    }

    #[test]
    fn extracts_plain_text_and_skips_binary_formats() {
        let text = extract_text("notes.txt", b"Fleet fuel report").unwrap();
        assert_eq!(text.as_deref(), Some("Fleet fuel report"));

        let binary = extract_text("brief.docx", b"\x50\x4b\x03\x04").unwrap();
        assert!(binary.is_none());
    }

    #[test]
    fn extension_parsing() {
        assert_eq!(file_extension("report.PDF"), "pdf");
        assert_eq!(file_extension("archive.tar.gz"), "gz");
        assert_eq!(file_extension("no_extension"), "");
    }
}
