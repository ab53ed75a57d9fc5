//! Embedding blob format: uint8 quantization with per-row scale and offset.
//!
//! A vector is stored as `len(D)` bytes plus two floats, where
//! `original ≈ byte * scale + offset`. Readers and writers agree on this
//! format; the `scale`/`offset` columns make the blob self-describing.

use ndarray::Array1;

/// Quantize a float32 embedding to uint8 bytes. Returns (bytes, scale, offset).
pub fn quantize_uint8(embedding: &Array1<f32>) -> (Vec<u8>, f32, f32) {
    let mut min_val = f32::INFINITY;
    let mut max_val = f32::NEG_INFINITY;
    for &v in embedding.iter() {
        min_val = min_val.min(v);
        max_val = max_val.max(v);
    }

    if max_val - min_val < 1e-9 {
        // Constant vector
        return (vec![0u8; embedding.len()], 0.0, min_val);
    }

    let scale = (max_val - min_val) / 255.0;
    let bytes = embedding
        .iter()
        .map(|&v| ((v - min_val) / scale).round().clamp(0.0, 255.0) as u8)
        .collect();
    (bytes, scale, min_val)
}

/// Dequantize uint8 bytes back to a float32 embedding.
pub fn dequantize_uint8(bytes: &[u8], scale: f32, offset: f32) -> Array1<f32> {
    Array1::from_iter(bytes.iter().map(|&b| b as f32 * scale + offset))
}

/// Cosine similarity between two vectors. Zero-norm inputs yield 0.
pub fn cosine_similarity(a: &Array1<f32>, b: &Array1<f32>) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let norm_a = a.dot(a).sqrt();
    let norm_b = b.dot(b).sqrt();
    if norm_a < 1e-9 || norm_b < 1e-9 {
        return 0.0;
    }
    a.dot(b) / (norm_a * norm_b)
}
