use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::errors::ChatError;
use crate::rag::chunker::DocumentChunk;

/// A chunk returned from a search, with its relevance score. The score
/// scale depends on the backend (match count for keyword, cosine for
/// vectors); only the ordering is comparable across backends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedChunk {
    pub chunk: DocumentChunk,
    pub score: f32,
}

/// Search interface shared by all retrieval backends.
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Backend name, for health reporting and logs.
    fn name(&self) -> &'static str;

    /// Return the `top_k` most relevant chunks for the query, best first.
    /// May return fewer, including none. The keyword backend never fails;
    /// vector backends fail if the query embedding call does.
    async fn search(&self, query: &str, top_k: usize) -> Result<Vec<RetrievedChunk>, ChatError>;
}
