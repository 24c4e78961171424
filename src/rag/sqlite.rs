//! Sqlite-persisted vector retriever.
//!
//! Embeddings live in a `rag_chunks` table as little-endian f32 BLOBs so
//! the index survives restarts; a fresh start with an unchanged corpus
//! skips the embedding calls entirely. A corpus fingerprint in `rag_meta`
//! decides reuse, so any content change forces a rebuild. Search is a
//! brute-force cosine scan over all rows, which is fine at this corpus
//! size.

use std::path::PathBuf;

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use std::sync::Arc;

use crate::core::errors::ChatError;
use crate::llm::provider::LlmProvider;
use crate::rag::chunker::DocumentChunk;
use crate::rag::cosine_similarity;
use crate::rag::retriever::{RetrievedChunk, Retriever};

const FINGERPRINT_KEY: &str = "corpus_fingerprint";

pub struct SqliteVectorRetriever {
    pool: SqlitePool,
    provider: Arc<dyn LlmProvider>,
    db_path: PathBuf,
}

fn db_err<E: std::fmt::Display>(err: E) -> ChatError {
    ChatError::Upstream(format!("rag store: {}", err))
}

impl SqliteVectorRetriever {
    pub async fn open(db_path: PathBuf, provider: Arc<dyn LlmProvider>) -> Result<Self, ChatError> {
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
            .map_err(db_err)?;

        let store = Self {
            pool,
            provider,
            db_path,
        };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), ChatError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS rag_chunks (
                chunk_id TEXT PRIMARY KEY,
                content TEXT NOT NULL,
                source TEXT NOT NULL DEFAULT '',
                start_offset INTEGER NOT NULL DEFAULT 0,
                chunk_index INTEGER NOT NULL DEFAULT 0,
                embedding BLOB,
                created_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_rag_source ON rag_chunks(source)")
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS rag_meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }

    /// Make the stored index match the corpus. The persisted rows are
    /// reused only when the stored fingerprint matches the corpus content;
    /// otherwise the table is rebuilt with fresh embeddings.
    pub async fn ensure_indexed(&self, chunks: &[DocumentChunk]) -> Result<(), ChatError> {
        let fingerprint = corpus_fingerprint(chunks);
        let stored = self.count().await?;
        let matches = self.stored_fingerprint().await?.as_deref() == Some(fingerprint.as_str());
        if stored > 0 && matches {
            tracing::info!("Reusing persisted RAG index ({} chunks)", stored);
            return Ok(());
        }

        let texts: Vec<String> = chunks.iter().map(|chunk| chunk.text.clone()).collect();
        let embeddings = self.provider.embed(&texts).await?;

        let mut tx = self.pool.begin().await.map_err(db_err)?;
        sqlx::query("DELETE FROM rag_chunks")
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

        for (chunk, embedding) in chunks.iter().zip(embeddings.iter()) {
            let blob = serialize_embedding(embedding);
            sqlx::query(
                "INSERT INTO rag_chunks (chunk_id, content, source, start_offset, chunk_index, embedding)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )
            .bind(&chunk.id)
            .bind(&chunk.text)
            .bind(&chunk.source)
            .bind(chunk.start_offset as i64)
            .bind(chunk.chunk_index as i64)
            .bind(&blob)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        }

        sqlx::query(
            "INSERT INTO rag_meta (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value,
                 updated_at = STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now')",
        )
        .bind(FINGERPRINT_KEY)
        .bind(&fingerprint)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        tx.commit().await.map_err(db_err)?;
        tracing::info!("Indexed {} chunks into {}", chunks.len(), self.db_path.display());
        Ok(())
    }

    async fn stored_fingerprint(&self) -> Result<Option<String>, ChatError> {
        let row = sqlx::query("SELECT value FROM rag_meta WHERE key = ?1")
            .bind(FINGERPRINT_KEY)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(row.map(|row| row.get("value")))
    }

    pub async fn count(&self) -> Result<usize, ChatError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM rag_chunks")
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;
        let n: i64 = row.get("n");
        Ok(n as usize)
    }

    fn row_to_chunk(row: &sqlx::sqlite::SqliteRow) -> DocumentChunk {
        DocumentChunk {
            id: row.get("chunk_id"),
            text: row.get("content"),
            source: row.get("source"),
            start_offset: row.get::<i64, _>("start_offset") as usize,
            chunk_index: row.get::<i64, _>("chunk_index") as usize,
        }
    }
}

/// Content hash of the corpus: source and text of every chunk, in order.
/// Chunk ids are excluded so a reloaded but unchanged corpus still matches.
fn corpus_fingerprint(chunks: &[DocumentChunk]) -> String {
    let mut hasher = Sha256::new();
    for chunk in chunks {
        hasher.update(chunk.source.as_bytes());
        hasher.update([0]);
        hasher.update(chunk.text.as_bytes());
        hasher.update([0xff]);
    }
    hex::encode(hasher.finalize())
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

#[async_trait]
impl Retriever for SqliteVectorRetriever {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    async fn search(&self, query: &str, top_k: usize) -> Result<Vec<RetrievedChunk>, ChatError> {
        let query_embedding = self
            .provider
            .embed(&[query.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ChatError::Upstream("no embedding for query".to_string()))?;

        let rows = sqlx::query(
            "SELECT chunk_id, content, source, start_offset, chunk_index, embedding
             FROM rag_chunks",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let mut scored: Vec<RetrievedChunk> = rows
            .iter()
            .map(|row| {
                let embedding = deserialize_embedding(row.get::<Vec<u8>, _>("embedding").as_slice());
                RetrievedChunk {
                    chunk: Self::row_to_chunk(row),
                    score: cosine_similarity(&query_embedding, &embedding),
                }
            })
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);

        Ok(scored)
    }
}
