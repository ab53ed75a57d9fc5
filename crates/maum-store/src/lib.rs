//! Maum Store — SQLite persistence for the emotion pipeline.
//!
//! One database file holds four logical collections:
//! - conversation messages (read-only input for session analysis),
//! - append-only emotion-analysis rows,
//! - analyzed-session markers (idempotency tokens),
//! - the emotion-context KB and the per-user similarity cache, both with
//!   int8-quantized embedding blobs and cosine search.

pub mod cache;
pub mod embedding;
pub mod kb;
pub mod schema;
pub mod sqlite;
pub mod types;

pub use embedding::{cosine_similarity, dequantize_uint8, quantize_uint8};
pub use sqlite::EmotionStore;
pub use types::{AnalysisRow, CacheHit, ConversationMessage, KbHit, SeedEntry, SessionRef};
