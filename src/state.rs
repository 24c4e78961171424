use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::config::{Config, RetrieverBackend};
use crate::history::ConversationStore;
use crate::llm::{GeminiProvider, LlmProvider};
use crate::rag::chunker;
use crate::rag::keyword::KeywordRetriever;
use crate::rag::memory::MemoryVectorRetriever;
use crate::rag::sqlite::SqliteVectorRetriever;
use crate::rag::Retriever;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub conversations: ConversationStore,
    pub retriever: Arc<dyn Retriever>,
    pub generator: Arc<dyn LlmProvider>,
    /// Set when corpus load, index build, or the model handshake failed at
    /// startup. The service keeps serving; requests surface the failure.
    pub degraded: bool,
    pub chunk_count: usize,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        config: Config,
        retriever: Arc<dyn Retriever>,
        generator: Arc<dyn LlmProvider>,
        chunk_count: usize,
        degraded: bool,
    ) -> Arc<Self> {
        Arc::new(Self {
            config,
            conversations: ConversationStore::new(),
            retriever,
            generator,
            degraded,
            chunk_count,
            started_at: Utc::now(),
        })
    }

    /// Build the full service state. Never fails: corpus, index, and
    /// handshake errors are logged and leave the service degraded, matching
    /// the original's log-and-continue startup.
    pub async fn initialize(config: Config) -> Arc<Self> {
        let mut degraded = false;

        let chunks = match chunker::load_corpus(&config.documents) {
            Ok(chunks) => {
                tracing::info!("Documents loaded: {} segments", chunks.len());
                chunks
            }
            Err(err) => {
                tracing::error!("Failed to load documents: {:#}", err);
                degraded = true;
                Vec::new()
            }
        };
        let chunk_count = chunks.len();

        let generator: Arc<dyn LlmProvider> = Arc::new(GeminiProvider::new(&config.gemini));
        match generator.generate("Connection test").await {
            Ok(_) => tracing::info!("Gemini connection established"),
            Err(err) => {
                tracing::warn!("Gemini handshake failed: {}", err);
                degraded = true;
            }
        }

        let retriever: Arc<dyn Retriever> = match config.retrieval.backend {
            RetrieverBackend::Keyword => Arc::new(KeywordRetriever::new(chunks)),
            RetrieverBackend::Memory => {
                match MemoryVectorRetriever::build(chunks, generator.clone()).await {
                    Ok(index) => Arc::new(index),
                    Err(err) => {
                        tracing::error!("Failed to build in-memory index: {}", err);
                        degraded = true;
                        Arc::new(MemoryVectorRetriever::empty(generator.clone()))
                    }
                }
            }
            RetrieverBackend::Sqlite => {
                match Self::open_sqlite_index(&config, &chunks, generator.clone()).await {
                    Ok(store) => Arc::new(store),
                    Err(err) => {
                        tracing::error!("Failed to build sqlite index: {}", err);
                        degraded = true;
                        Arc::new(MemoryVectorRetriever::empty(generator.clone()))
                    }
                }
            }
        };

        tracing::info!(
            "Retrieval backend: {} ({} chunks{})",
            retriever.name(),
            chunk_count,
            if degraded { ", degraded" } else { "" }
        );

        Self::new(config, retriever, generator, chunk_count, degraded)
    }

    async fn open_sqlite_index(
        config: &Config,
        chunks: &[chunker::DocumentChunk],
        generator: Arc<dyn LlmProvider>,
    ) -> Result<SqliteVectorRetriever, crate::core::errors::ChatError> {
        let store = SqliteVectorRetriever::open(config.rag_db_path(), generator).await?;
        store.ensure_indexed(chunks).await?;
        Ok(store)
    }
}
