//! Maum Infer — sentence-embedding engine and query cache.
//!
//! With the `onnx` feature and model files present, `OnnxEmbedder` loads
//! jhgan/ko-sroberta-multitask for 768-dim Korean sentence embeddings.
//! Without it, the deterministic `HashingEmbedder` stands in so the rest
//! of the pipeline keeps working (cache lookups become near-exact-match).

pub mod cache;
pub mod embedder;
pub mod onnx_embedder;

pub use cache::QueryCache;
pub use embedder::{EmbedderBackend, EmbeddingResult, HashingEmbedder};

#[cfg(feature = "onnx")]
pub use onnx_embedder::OnnxEmbedder;

use std::path::Path;
use std::sync::Arc;

/// Embedding dimension the pipeline is built around (ko-sroberta-multitask).
pub const EMBEDDING_DIM: usize = 768;

/// Create the embedder for the given model directory.
///
/// With the `onnx` feature a missing or broken model is fatal: a silently
/// degraded embedder would poison the KB and cache with vectors from a
/// different space. Without the feature the hashing fallback is used.
pub fn load_embedder(model_dir: &Path) -> Result<Arc<dyn EmbedderBackend>, String> {
    #[cfg(feature = "onnx")]
    {
        let embedder = OnnxEmbedder::load(model_dir)?;
        tracing::info!("Using ONNX embedder (dim={})", embedder.dimension());
        Ok(Arc::new(embedder))
    }

    #[cfg(not(feature = "onnx"))]
    {
        let _ = model_dir;
        tracing::warn!(
            "ONNX feature disabled; using deterministic hashing embedder (dim={})",
            EMBEDDING_DIM
        );
        Ok(Arc::new(HashingEmbedder::new(EMBEDDING_DIM)))
    }
}
