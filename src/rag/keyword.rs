//! Term-overlap retriever.
//!
//! Scores each chunk by the number of query tokens that occur anywhere in
//! the lowercased chunk text. Presence per token, not frequency: a token
//! repeated in the chunk still contributes exactly 1. No stemming, no
//! normalization beyond lowercasing.

use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;

use crate::core::errors::ChatError;
use crate::rag::chunker::DocumentChunk;
use crate::rag::retriever::{RetrievedChunk, Retriever};

pub struct KeywordRetriever {
    chunks: Vec<DocumentChunk>,
}

impl KeywordRetriever {
    pub fn new(chunks: Vec<DocumentChunk>) -> Self {
        Self { chunks }
    }
}

fn tokenize(query: &str) -> Vec<String> {
    static WORD: OnceLock<Regex> = OnceLock::new();
    let re = WORD.get_or_init(|| Regex::new(r"\w+").expect("literal pattern"));
    re.find_iter(&query.to_lowercase())
        .map(|m| m.as_str().to_string())
        .collect()
}

#[async_trait]
impl Retriever for KeywordRetriever {
    fn name(&self) -> &'static str {
        "keyword"
    }

    async fn search(&self, query: &str, top_k: usize) -> Result<Vec<RetrievedChunk>, ChatError> {
        let terms = tokenize(query);
        if terms.is_empty() {
            return Ok(Vec::new());
        }

        let mut results: Vec<(usize, &DocumentChunk)> = self
            .chunks
            .iter()
            .map(|chunk| {
                let text = chunk.text.to_lowercase();
                let score = terms.iter().filter(|term| text.contains(term.as_str())).count();
                (score, chunk)
            })
            .filter(|(score, _)| *score > 0)
            .collect();

        // stable sort: ties keep corpus order
        results.sort_by(|a, b| b.0.cmp(&a.0));
        results.truncate(top_k);

        Ok(results
            .into_iter()
            .map(|(score, chunk)| RetrievedChunk {
                chunk: chunk.clone(),
                score: score as f32,
            })
            .collect())
    }
}
