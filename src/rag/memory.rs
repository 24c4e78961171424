//! In-memory vector retriever.
//!
//! Chunk embeddings are computed once at startup through the LLM provider
//! and held in a plain Vec; every search embeds the query and ranks the
//! corpus by brute-force cosine similarity. Rebuilt from scratch on every
//! process start.

use std::sync::Arc;

use async_trait::async_trait;

use crate::core::errors::ChatError;
use crate::llm::provider::LlmProvider;
use crate::rag::chunker::DocumentChunk;
use crate::rag::cosine_similarity;
use crate::rag::retriever::{RetrievedChunk, Retriever};

pub struct MemoryVectorRetriever {
    entries: Vec<(DocumentChunk, Vec<f32>)>,
    provider: Arc<dyn LlmProvider>,
}

impl MemoryVectorRetriever {
    /// Embed the whole corpus and build the index. Fails if the embedding
    /// call does; the caller may fall back to `empty` and run degraded.
    pub async fn build(
        chunks: Vec<DocumentChunk>,
        provider: Arc<dyn LlmProvider>,
    ) -> Result<Self, ChatError> {
        let texts: Vec<String> = chunks.iter().map(|chunk| chunk.text.clone()).collect();
        let embeddings = provider.embed(&texts).await?;

        Ok(Self {
            entries: chunks.into_iter().zip(embeddings).collect(),
            provider,
        })
    }

    /// An index with no entries. Searches still embed the query, so a
    /// broken provider surfaces its tagged error per request.
    pub fn empty(provider: Arc<dyn LlmProvider>) -> Self {
        Self {
            entries: Vec::new(),
            provider,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl Retriever for MemoryVectorRetriever {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn search(&self, query: &str, top_k: usize) -> Result<Vec<RetrievedChunk>, ChatError> {
        let query_embedding = self
            .provider
            .embed(&[query.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ChatError::Upstream("no embedding for query".to_string()))?;

        let mut scored: Vec<RetrievedChunk> = self
            .entries
            .iter()
            .map(|(chunk, embedding)| RetrievedChunk {
                chunk: chunk.clone(),
                score: cosine_similarity(&query_embedding, embedding),
            })
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);

        Ok(scored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Deterministic provider: embeds known words onto fixed axes.
    struct AxisProvider;

    #[async_trait]
    impl LlmProvider for AxisProvider {
        fn name(&self) -> &str {
            "axis"
        }

        async fn generate(&self, _prompt: &str) -> Result<String, ChatError> {
            Ok("ok".to_string())
        }

        async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ChatError> {
            Ok(inputs
                .iter()
                .map(|text| {
                    if text.contains("sky") {
                        vec![1.0, 0.0, 0.0]
                    } else if text.contains("ocean") {
                        vec![0.0, 1.0, 0.0]
                    } else {
                        vec![0.0, 0.0, 1.0]
                    }
                })
                .collect())
        }
    }

    fn chunk(text: &str, source: &str) -> DocumentChunk {
        DocumentChunk {
            id: uuid::Uuid::new_v4().to_string(),
            text: text.to_string(),
            source: source.to_string(),
            start_offset: 0,
            chunk_index: 0,
        }
    }

    #[tokio::test]
    async fn ranks_by_cosine_similarity() {
        let retriever = MemoryVectorRetriever::build(
            vec![
                chunk("the deep ocean", "doc2"),
                chunk("the blue sky", "doc1"),
                chunk("pure numbers", "doc3"),
            ],
            Arc::new(AxisProvider),
        )
        .await
        .unwrap();

        let hits = retriever.search("look at the sky", 2).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].chunk.source, "doc1");
        assert!((hits[0].score - 1.0).abs() < 1e-6);
        assert!(hits[1].score < hits[0].score);
    }

    #[tokio::test]
    async fn empty_index_returns_no_hits() {
        let retriever = MemoryVectorRetriever::empty(Arc::new(AxisProvider));
        assert!(retriever.is_empty());
        let hits = retriever.search("anything", 3).await.unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn failing_embed_surfaces_tagged_error() {
        struct BrokenProvider;

        #[async_trait]
        impl LlmProvider for BrokenProvider {
            fn name(&self) -> &str {
                "broken"
            }
            async fn generate(&self, _prompt: &str) -> Result<String, ChatError> {
                Err(ChatError::Unauthorized("bad key".to_string()))
            }
            async fn embed(&self, _inputs: &[String]) -> Result<Vec<Vec<f32>>, ChatError> {
                Err(ChatError::Unauthorized("bad key".to_string()))
            }
        }

        let retriever = MemoryVectorRetriever::empty(Arc::new(BrokenProvider));
        let err = retriever.search("anything", 3).await.unwrap_err();
        assert!(matches!(err, ChatError::Unauthorized(_)));
    }
}
