//! Configuration and data directory management.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Paths to all pipeline data locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataPaths {
    /// Root data directory (e.g., `data/`).
    pub root: PathBuf,
    /// SQLite database directory (`data/db/`).
    pub db_dir: PathBuf,
    /// Embedding model directory (`data/models/`).
    pub models_dir: PathBuf,
    /// KB seed file (`data/emotion_seed.json`).
    pub seed_file: PathBuf,
}

impl DataPaths {
    /// Create data paths from a root directory. Creates directories if needed.
    pub fn new(root: impl AsRef<Path>) -> std::io::Result<Self> {
        let root = root.as_ref().to_path_buf();
        let paths = Self {
            db_dir: root.join("db"),
            models_dir: root.join("models"),
            seed_file: root.join("emotion_seed.json"),
            root,
        };
        std::fs::create_dir_all(&paths.db_dir)?;
        std::fs::create_dir_all(&paths.models_dir)?;
        Ok(paths)
    }
}

/// Top-level pipeline configuration.
#[derive(Debug, Clone)]
pub struct MaumConfig {
    /// Chat model identifier passed to the LLM client.
    pub llm_model: String,
    /// LLM API credential. Absence is a fatal startup error.
    pub llm_api_key: String,
    /// OpenAI-compatible API base URL.
    pub llm_base_url: String,
    /// Hard wall-clock timeout for one completion call.
    pub llm_timeout_seconds: u64,
    /// Pinned sentence-embedding model identifier. Changing it invalidates
    /// the KB and similarity cache.
    pub embedding_model: String,
    /// Minimum cosine similarity for a cache hit.
    pub cache_similarity_threshold: f64,
    /// Maximum age in days for a cache hit.
    pub cache_freshness_days: i64,
    /// Maximum sessions processed per batch pass.
    pub batch_session_limit: usize,
    /// Seconds between batch passes in loop mode.
    pub batch_interval_seconds: u64,
    pub data_paths: DataPaths,
}

fn env_parsed<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl MaumConfig {
    /// Create configuration from environment and defaults.
    pub fn from_env(data_dir: impl AsRef<Path>) -> Result<Self> {
        let llm_api_key = std::env::var("LLM_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                Error::Config("LLM_API_KEY is not set; refusing to start".into())
            })?;

        let data_paths = DataPaths::new(data_dir)?;

        Ok(Self {
            llm_model: std::env::var("LLM_MODEL").unwrap_or_else(|_| "gpt-4o-mini".into()),
            llm_api_key,
            llm_base_url: std::env::var("LLM_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".into()),
            llm_timeout_seconds: env_parsed("LLM_TIMEOUT_SECONDS", 30),
            embedding_model: std::env::var("EMBEDDING_MODEL")
                .unwrap_or_else(|_| "jhgan/ko-sroberta-multitask".into()),
            cache_similarity_threshold: env_parsed("CACHE_SIMILARITY_THRESHOLD", 0.85),
            cache_freshness_days: env_parsed("CACHE_FRESHNESS_DAYS", 30),
            batch_session_limit: env_parsed("BATCH_SESSION_LIMIT", 100),
            batch_interval_seconds: env_parsed("MAUM_BATCH_INTERVAL_SECONDS", 600),
            data_paths,
        })
    }
}
