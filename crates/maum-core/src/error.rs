//! Error types for the emotion pipeline.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Transient errors leave the session eligible for retry on the next
    /// batch pass; everything else is treated as permanent for the caller.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Llm(_) | Error::Embedding(_) | Error::Database(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
