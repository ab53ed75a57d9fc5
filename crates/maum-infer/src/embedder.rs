//! Embedding engine trait and the deterministic fallback.
//!
//! `EmbedderBackend` abstracts over sentence-embedding generation:
//! - `OnnxEmbedder`: ONNX Runtime with ko-sroberta-multitask (requires the
//!   `onnx` feature and model files on disk)
//! - `HashingEmbedder`: deterministic character n-gram hashing, used when
//!   no model is available and in tests

use ndarray::Array1;

/// Result of an embedding operation.
pub struct EmbeddingResult {
    /// Float32 embedding vector (768-dim for ko-sroberta-multitask).
    pub embedding: Array1<f32>,
    /// Whether this was served from cache.
    pub cached: bool,
}

/// Trait for embedding backends.
pub trait EmbedderBackend: Send + Sync {
    /// Generate an embedding for a text string.
    /// Returns None if the backend cannot embed this input.
    fn embed(&self, text: &str) -> Option<EmbeddingResult>;

    /// Get the embedding dimension.
    fn dimension(&self) -> usize;
}

/// Empty input crashes some tokenizer stacks; a single space embeds fine
/// and all backends agree on this substitution.
pub(crate) fn effective_text(text: &str) -> &str {
    if text.is_empty() {
        " "
    } else {
        text
    }
}

/// Deterministic embedder hashing character bigrams into fixed buckets.
///
/// Not semantically meaningful, but stable: equal texts get equal vectors
/// and near-equal texts get near-equal vectors. Good enough for exact-ish
/// cache lookups in model-less deployments.
pub struct HashingEmbedder {
    dim: usize,
}

impl HashingEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }

    fn bucket(&self, a: char, b: char) -> usize {
        // FNV-1a over the two scalar values
        let mut h: u64 = 0xcbf29ce484222325;
        for unit in [a as u32, b as u32] {
            for byte in unit.to_le_bytes() {
                h ^= byte as u64;
                h = h.wrapping_mul(0x100000001b3);
            }
        }
        (h % self.dim as u64) as usize
    }
}

impl EmbedderBackend for HashingEmbedder {
    fn embed(&self, text: &str) -> Option<EmbeddingResult> {
        let text = effective_text(text);
        let mut v: Array1<f32> = Array1::zeros(self.dim);
        let chars: Vec<char> = text.chars().collect();
        if chars.len() == 1 {
            v[self.bucket(chars[0], chars[0])] += 1.0;
        }
        for pair in chars.windows(2) {
            v[self.bucket(pair[0], pair[1])] += 1.0;
        }
        let norm = v.dot(&v).sqrt();
        if norm > 1e-9 {
            v.mapv_inplace(|x| x / norm);
        }
        Some(EmbeddingResult {
            embedding: v,
            cached: false,
        })
    }

    fn dimension(&self) -> usize {
        self.dim
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashing_is_deterministic() {
        let e = HashingEmbedder::new(64);
        let a = e.embed("오늘 기분이 좋아요").unwrap().embedding;
        let b = e.embed("오늘 기분이 좋아요").unwrap().embedding;
        assert_eq!(a, b);
    }

    #[test]
    fn different_texts_differ() {
        let e = HashingEmbedder::new(64);
        let a = e.embed("오늘 기분이 좋아요").unwrap().embedding;
        let b = e.embed("너무 화가 나요").unwrap().embedding;
        assert_ne!(a, b);
    }

    #[test]
    fn empty_text_embeds_as_space() {
        let e = HashingEmbedder::new(64);
        let empty = e.embed("").unwrap().embedding;
        let space = e.embed(" ").unwrap().embedding;
        assert_eq!(empty, space);
    }

    #[test]
    fn vectors_are_unit_norm() {
        let e = HashingEmbedder::new(64);
        let v = e.embed("괜찮아요").unwrap().embedding;
        let norm = v.dot(&v).sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }
}
