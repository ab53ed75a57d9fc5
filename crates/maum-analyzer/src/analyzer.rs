//! The analysis pipeline: KB retrieval, LLM call, repair and derivation.

use std::sync::Arc;

use ndarray::Array1;
use tracing::warn;

use maum_core::{AnalysisResult, DistributionEntry, Result};
use maum_infer::EmbedderBackend;
use maum_llm::CompletionBackend;
use maum_store::EmotionStore;

use crate::derive::{
    primary_emotion, secondary_emotions, sentiment, service_signals, sorted_entries,
};
use crate::prompt::{system_prompt, user_prompt};
use crate::repair::{normalize, parse_response, repair};
use crate::tags::{report_tags, response_styles, routine_tags};

/// KB snippets attached to the user prompt.
const KB_CONTEXT_K: usize = 5;

/// Emotion analyzer over a store, an embedder and a completion backend.
///
/// Generic over the backend so tests can script completions without a
/// network.
pub struct EmotionAnalyzer<C> {
    store: Arc<EmotionStore>,
    embedder: Arc<dyn EmbedderBackend>,
    llm: C,
}

impl<C: CompletionBackend> EmotionAnalyzer<C> {
    pub fn new(store: Arc<EmotionStore>, embedder: Arc<dyn EmbedderBackend>, llm: C) -> Self {
        Self { store, embedder, llm }
    }

    /// Embed a text with the configured backend, if it can.
    pub fn embed(&self, text: &str) -> Option<Array1<f32>> {
        self.embedder.embed(text).map(|r| r.embedding)
    }

    /// Analyze one text end to end.
    pub async fn analyze(&self, text: &str) -> Result<AnalysisResult> {
        let embedding = self.embed(text);
        self.analyze_with_embedding(text, embedding.as_ref()).await
    }

    /// Analyze with a caller-provided embedding, so a session pipeline that
    /// already embedded the text for its cache lookup does not embed twice.
    pub async fn analyze_with_embedding(
        &self,
        text: &str,
        embedding: Option<&Array1<f32>>,
    ) -> Result<AnalysisResult> {
        // Retrieval failure is non-fatal: analysis proceeds without context.
        let context = match embedding {
            Some(e) => self.store.kb_search(e, KB_CONTEXT_K).unwrap_or_else(|err| {
                warn!("KB retrieval failed, analyzing without context: {}", err);
                Vec::new()
            }),
            None => Vec::new(),
        };

        let completion = self
            .llm
            .complete_json(&system_prompt(), &user_prompt(text, &context))
            .await?;

        build_result(text, &completion)
    }
}

/// Deterministic tail of the pipeline: same completion bytes, same result.
pub fn build_result(text: &str, completion: &str) -> Result<AnalysisResult> {
    let parsed = parse_response(completion)?;
    let mut repaired = repair(&parsed);
    if repaired.modified {
        warn!("LLM distribution needed repair (dropped/coerced/filled entries)");
    }
    normalize(&mut repaired.entries);

    let sorted = sorted_entries(&repaired.entries);
    let primary = primary_emotion(&sorted);
    let secondaries = secondary_emotions(&sorted);
    drop(sorted);

    let overall = sentiment(&repaired.entries);
    let signals = service_signals(&repaired.entries, overall);

    let raw_distribution = repaired
        .entries
        .iter()
        .filter(|e| !e.filled && e.score > 0.0)
        .map(|e| DistributionEntry {
            code: e.code.to_string(),
            name_ko: e.name_ko.to_string(),
            group: e.group,
            score: e.score,
        })
        .collect();

    Ok(AnalysisResult {
        text: text.to_string(),
        language: "ko".to_string(),
        raw_distribution,
        recommended_response_style: response_styles(&primary, overall),
        recommended_routine_tags: routine_tags(&primary, overall),
        report_tags: report_tags(&primary, &secondaries, overall),
        primary_emotion: primary,
        secondary_emotions: secondaries,
        sentiment_overall: overall,
        service_signals: signals,
        analysis_id: None,
        message_count: None,
        cached: None,
        cache_similarity: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use maum_core::taxonomy::EmotionGroup;
    use maum_core::{RiskLevel, Sentiment};

    fn completion(pairs: &[(&str, f64)]) -> String {
        let items: Vec<String> = pairs
            .iter()
            .map(|(code, score)| format!(r#"{{"code": "{}", "score": {}}}"#, code, score))
            .collect();
        format!(r#"{{"raw_distribution": [{}]}}"#, items.join(","))
    }

    #[test]
    fn depressive_text_derives_negative_result() {
        let result = build_result(
            "오늘 너무 우울하고 아무것도 하기 싫어요",
            &completion(&[("depression", 0.6), ("sadness", 0.3), ("boredom", 0.1)]),
        )
        .unwrap();

        assert_eq!(result.primary_emotion.code, "depression");
        assert_eq!(result.primary_emotion.group, EmotionGroup::Negative);
        assert_eq!(result.sentiment_overall, Sentiment::Negative);
        assert!(result.service_signals.need_empathy);
        assert!(result.service_signals.risk_level >= RiskLevel::Watch);
        assert_eq!(result.language, "ko");
    }

    #[test]
    fn positive_text_derives_positive_result() {
        let result = build_result(
            "오늘 산책하니까 기분이 정말 좋아요",
            &completion(&[("joy", 0.7), ("relief", 0.2), ("interest", 0.1)]),
        )
        .unwrap();

        assert_eq!(result.primary_emotion.code, "joy");
        assert_eq!(result.sentiment_overall, Sentiment::Positive);
        assert_eq!(result.service_signals.risk_level, RiskLevel::Normal);
        assert!(!result.recommended_routine_tags.is_empty());
    }

    #[test]
    fn raw_distribution_hides_floor_entries() {
        let result = build_result("짜증나", &completion(&[("anger", 1.0)])).unwrap();
        assert_eq!(result.raw_distribution.len(), 1);
        assert_eq!(result.raw_distribution[0].code, "anger");
        assert!(result.raw_distribution[0].score > 0.9);
    }

    #[test]
    fn derivation_is_reproducible() {
        let text = "그냥 그런 하루였어요";
        let c = completion(&[("boredom", 0.4), ("relief", 0.35), ("interest", 0.25)]);
        let a = build_result(text, &c).unwrap();
        let b = build_result(text, &c).unwrap();
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }

    #[test]
    fn prose_wrapped_completion_still_works() {
        let wrapped = format!("결과: {} 감사합니다", completion(&[("fear", 0.8)]));
        let result = build_result("무서워요", &wrapped).unwrap();
        assert_eq!(result.primary_emotion.code, "fear");
    }

    #[test]
    fn completion_without_json_is_an_error() {
        assert!(build_result("무서워요", "분석 불가").is_err());
    }

    #[test]
    fn uncontested_primary_gets_capped_confidence() {
        // All other codes are floor-filled, so the runner-up is non-zero
        // and confidence comes from the formula, not the s=0 shortcut.
        let result = build_result("화나", &completion(&[("anger", 1.0)])).unwrap();
        assert!(result.primary_emotion.confidence <= 0.95);
        assert!(result.primary_emotion.confidence >= 0.55);
    }

    #[test]
    fn session_scoped_fields_start_empty() {
        let result = build_result("무서워요", &completion(&[("fear", 0.8)])).unwrap();
        assert!(result.analysis_id.is_none());
        assert!(result.cached.is_none());
        assert!(result.message_count.is_none());
    }
}
