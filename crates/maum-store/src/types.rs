//! Store-level data types.

use maum_core::AnalysisResult;
use serde::{Deserialize, Serialize};

/// One conversation message row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub id: i64,
    pub user_id: i64,
    pub session_id: String,
    pub role: String,
    pub content: String,
    pub created_at: i64,
}

/// A session awaiting analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRef {
    pub session_id: String,
    pub user_id: i64,
}

/// One item of the KB seed file (the original `sample_emotions.json` shape).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedEntry {
    pub text: String,
    pub emotion: String,
    pub intensity: i64,
}

/// One KB retrieval hit, ordered by ascending distance.
#[derive(Debug, Clone)]
pub struct KbHit {
    pub text: String,
    pub emotion_code: String,
    pub intensity: i64,
    /// 1 − cosine similarity. A ranking signal, never a probability.
    pub distance: f64,
}

/// A similarity-cache hit.
#[derive(Debug, Clone)]
pub struct CacheHit {
    pub result: AnalysisResult,
    pub similarity: f64,
    pub age_days: i64,
    pub original_text: String,
    pub analysis_id: i64,
}

/// A persisted emotion-analysis row.
#[derive(Debug, Clone)]
pub struct AnalysisRow {
    pub id: i64,
    pub user_id: i64,
    pub source: String,
    pub input_text: String,
    pub result: AnalysisResult,
    pub has_embedding: bool,
    pub created_at: i64,
}
