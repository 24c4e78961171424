use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Runtime configuration, loaded from `lunachat.toml` (or the file named by
/// `LUNACHAT_CONFIG`) with environment overrides applied on top. Every field
/// has a default so the service starts with no config file at all.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub documents: DocumentsConfig,
    pub retrieval: RetrievalConfig,
    pub gemini: GeminiConfig,
    /// Directory for logs and the persistent vector index.
    pub data_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DocumentsConfig {
    /// The fixed corpus, read as UTF-8 text at startup.
    pub paths: Vec<PathBuf>,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub backend: RetrieverBackend,
    pub top_k: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    /// Never committed; normally supplied via GEMINI_API_KEY.
    pub api_key: String,
    pub model: String,
    pub embedding_model: String,
    pub base_url: String,
}

/// Which retriever implementation serves `/api/chat`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetrieverBackend {
    /// Naive term-overlap scoring, no remote calls.
    Keyword,
    /// Embeddings held in memory, rebuilt every start.
    Memory,
    /// Embeddings persisted in sqlite, reused across restarts.
    Sqlite,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            documents: DocumentsConfig::default(),
            retrieval: RetrievalConfig::default(),
            gemini: GeminiConfig::default(),
            data_dir: PathBuf::from("./data"),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 5000 }
    }
}

impl Default for DocumentsConfig {
    fn default() -> Self {
        Self {
            paths: vec![
                PathBuf::from("./documents/doc1.txt"),
                PathBuf::from("./documents/doc2.txt"),
            ],
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            backend: RetrieverBackend::Keyword,
            top_k: 3,
        }
    }
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: "gemini-2.0-flash".to_string(),
            embedding_model: "embedding-001".to_string(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
        }
    }
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let path = env::var("LUNACHAT_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("lunachat.toml"));
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let mut config = if path.exists() {
            let raw = fs::read_to_string(path)?;
            toml::from_str::<Config>(&raw)?
        } else {
            Config::default()
        };
        config.apply_env();

        fs::create_dir_all(&config.data_dir)?;
        fs::create_dir_all(config.log_dir())?;

        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(key) = env::var("GEMINI_API_KEY") {
            if !key.is_empty() {
                self.gemini.api_key = key;
            }
        }
        if let Some(port) = env::var("PORT").ok().and_then(|val| val.parse::<u16>().ok()) {
            self.server.port = port;
        }
        if let Ok(dir) = env::var("LUNACHAT_DATA_DIR") {
            if !dir.is_empty() {
                self.data_dir = PathBuf::from(dir);
            }
        }
    }

    pub fn log_dir(&self) -> PathBuf {
        self.data_dir.join("logs")
    }

    pub fn rag_db_path(&self) -> PathBuf {
        self.data_dir.join("rag.db")
    }
}
