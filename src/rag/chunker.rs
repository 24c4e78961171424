//! Corpus loading and text chunking.
//!
//! The corpus is a small fixed set of UTF-8 files, read once at startup and
//! split into overlapping character windows. Chunks are immutable for the
//! rest of the process lifetime.

use std::fs;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::config::DocumentsConfig;

/// A segment of a source document, tagged with its origin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub id: String,
    /// The text content.
    pub text: String,
    /// Source identifier (file path).
    pub source: String,
    /// Character offset in the original document.
    pub start_offset: usize,
    /// Chunk index within the source.
    pub chunk_index: usize,
}

/// Load every configured document and split it into chunks.
///
/// Fails as a unit: one unreadable file aborts the whole load, and the
/// caller decides whether to run degraded with an empty corpus.
pub fn load_corpus(config: &DocumentsConfig) -> anyhow::Result<Vec<DocumentChunk>> {
    let mut chunks = Vec::new();
    for path in &config.paths {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read document {}", path.display()))?;
        chunks.extend(split_text(&text, &source_name(path), config));
    }
    Ok(chunks)
}

fn source_name(path: &Path) -> String {
    path.display().to_string()
}

/// Split text into overlapping character windows.
pub fn split_text(text: &str, source: &str, config: &DocumentsConfig) -> Vec<DocumentChunk> {
    let chunk_size = config.chunk_size.max(1);
    let overlap = config.chunk_overlap.min(chunk_size.saturating_sub(1));

    let chars: Vec<char> = text.chars().collect();
    let total_chars = chars.len();

    let mut chunks = Vec::new();
    if total_chars == 0 {
        return chunks;
    }

    let step = chunk_size.saturating_sub(overlap).max(1);
    let mut start = 0;
    let mut chunk_index = 0;

    while start < total_chars {
        let end = (start + chunk_size).min(total_chars);
        let chunk_text: String = chars[start..end].iter().collect();
        let trimmed = chunk_text.trim();

        if !trimmed.is_empty() {
            chunks.push(DocumentChunk {
                id: uuid::Uuid::new_v4().to_string(),
                text: trimmed.to_string(),
                source: source.to_string(),
                start_offset: start,
                chunk_index,
            });
            chunk_index += 1;
        }

        if end == total_chars {
            break;
        }
        start += step;
    }

    chunks
}
