//! Wire types for analysis results.
//!
//! `AnalysisResult` is the stable JSON shape consumed by downstream
//! response/routine/report services. It is immutable once persisted.

use serde::{Deserialize, Serialize};

use crate::taxonomy::EmotionGroup;

/// Overall polarity verdict derived from group sums.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

/// Four-level risk indicator for downstream care services.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Normal,
    Watch,
    Alert,
    Critical,
}

/// One emotion with its normalized score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistributionEntry {
    pub code: String,
    pub name_ko: String,
    pub group: EmotionGroup,
    pub score: f64,
}

/// The argmax emotion of the normalized distribution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrimaryEmotion {
    pub code: String,
    pub name_ko: String,
    pub group: EmotionGroup,
    /// 1..=5, piecewise-mapped from the normalized score.
    pub intensity: u8,
    /// 0..=1, monotone in the argmax score and its lead over the runner-up.
    pub confidence: f64,
}

/// Up to three runner-up emotions with score > 0.05.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecondaryEmotion {
    pub code: String,
    pub name_ko: String,
    pub intensity: u8,
}

/// Boolean flags plus risk level consumed by downstream services.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceSignals {
    pub need_empathy: bool,
    pub need_routine_recommend: bool,
    pub need_health_check: bool,
    pub need_voice_analysis: bool,
    pub risk_level: RiskLevel,
}

/// The externally visible analysis record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub text: String,
    /// Always "ko".
    pub language: String,
    /// Only entries the LLM actually produced with score > 0; repaired
    /// floor entries are suppressed. Scores are normalized.
    pub raw_distribution: Vec<DistributionEntry>,
    pub primary_emotion: PrimaryEmotion,
    pub secondary_emotions: Vec<SecondaryEmotion>,
    pub sentiment_overall: Sentiment,
    pub service_signals: ServiceSignals,
    pub recommended_response_style: Vec<String>,
    pub recommended_routine_tags: Vec<String>,
    pub report_tags: Vec<String>,

    /// Present on persisted or cached returns.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis_id: Option<i64>,
    /// Present on session-scoped returns.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_count: Option<usize>,
    /// Present on session-scoped returns.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cached: Option<bool>,
    /// Present on cache hits.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_similarity: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_fields_are_omitted_when_absent() {
        let result = AnalysisResult {
            text: "테스트".into(),
            language: "ko".into(),
            raw_distribution: vec![],
            primary_emotion: PrimaryEmotion {
                code: "joy".into(),
                name_ko: "기쁨".into(),
                group: EmotionGroup::Positive,
                intensity: 3,
                confidence: 0.8,
            },
            secondary_emotions: vec![],
            sentiment_overall: Sentiment::Positive,
            service_signals: ServiceSignals {
                need_empathy: false,
                need_routine_recommend: false,
                need_health_check: false,
                need_voice_analysis: false,
                risk_level: RiskLevel::Normal,
            },
            recommended_response_style: vec![],
            recommended_routine_tags: vec![],
            report_tags: vec![],
            analysis_id: None,
            message_count: None,
            cached: None,
            cache_similarity: None,
        };

        let json = serde_json::to_value(&result).unwrap();
        assert!(json.get("analysis_id").is_none());
        assert!(json.get("cached").is_none());
        assert_eq!(json["sentiment_overall"], "positive");
        assert_eq!(json["service_signals"]["risk_level"], "normal");
    }

    #[test]
    fn risk_levels_are_ordered() {
        assert!(RiskLevel::Critical > RiskLevel::Alert);
        assert!(RiskLevel::Alert > RiskLevel::Watch);
        assert!(RiskLevel::Watch > RiskLevel::Normal);
    }
}
