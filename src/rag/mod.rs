//! Retrieval layer.
//!
//! One `Retriever` trait, three interchangeable backends selected by
//! configuration: naive term-overlap scoring (`keyword`), an in-memory
//! vector index (`memory`), and a sqlite-persisted vector index (`sqlite`).

pub mod chunker;
pub mod keyword;
pub mod memory;
pub mod retriever;
pub mod sqlite;

pub use chunker::DocumentChunk;
pub use retriever::{RetrievedChunk, Retriever};

/// Cosine similarity between two embedding vectors. Mismatched or empty
/// inputs score 0.
pub(crate) fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
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
        dot / denom
    }
}
