//! Deterministic derivation from the normalized distribution.
//!
//! Pure functions of the normalized scores; given the same distribution
//! they always produce the same primary, secondaries, sentiment and
//! service signals.

use maum_core::taxonomy::EmotionGroup;
use maum_core::{PrimaryEmotion, RiskLevel, SecondaryEmotion, Sentiment, ServiceSignals};

use crate::repair::RepairedEntry;

const SECONDARY_MIN_SCORE: f64 = 0.05;
const MAX_SECONDARIES: usize = 3;
const SENTIMENT_BAND: f64 = 0.2;
const EPS: f64 = 1e-9;

/// Entries sorted descending by score. Ties keep taxonomy order (the
/// input order), which makes the argmax reproducible.
pub fn sorted_entries(entries: &[RepairedEntry]) -> Vec<&RepairedEntry> {
    let mut sorted: Vec<&RepairedEntry> = entries.iter().collect();
    sorted.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    sorted
}

/// Piecewise intensity mapping on a normalized score.
pub fn intensity(score: f64) -> u8 {
    if score >= 0.70 {
        5
    } else if score >= 0.45 {
        4
    } else if score >= 0.25 {
        3
    } else if score >= 0.10 {
        2
    } else {
        1
    }
}

/// Confidence from the primary score `p` and the runner-up score `s`.
/// An uncontested argmax (`s = 0`) gets the cap outright.
pub fn confidence(p: f64, s: f64) -> f64 {
    if s <= 0.0 {
        return 0.95;
    }
    let base = 0.55 + 0.2 * p;
    let shaped = 0.6 + 0.3 * p + 0.4 * (p - s) + ((p / s.max(EPS) - 1.0) * 0.1).min(0.3);
    let value = base.max(shaped).min(0.95);
    (value * 100.0).round() / 100.0
}

/// Overall sentiment from the positive/negative group mass difference.
pub fn sentiment(entries: &[RepairedEntry]) -> Sentiment {
    let positive: f64 = entries
        .iter()
        .filter(|e| e.group == EmotionGroup::Positive)
        .map(|e| e.score)
        .sum();
    let negative: f64 = entries
        .iter()
        .filter(|e| e.group == EmotionGroup::Negative)
        .map(|e| e.score)
        .sum();
    let delta = positive - negative;
    if delta > SENTIMENT_BAND {
        Sentiment::Positive
    } else if delta < -SENTIMENT_BAND {
        Sentiment::Negative
    } else {
        Sentiment::Neutral
    }
}

fn score_of(entries: &[RepairedEntry], code: &str) -> f64 {
    entries.iter().find(|e| e.code == code).map(|e| e.score).unwrap_or(0.0)
}

/// Service signals: empathy/routine/health/voice flags plus the risk level.
pub fn service_signals(entries: &[RepairedEntry], overall: Sentiment) -> ServiceSignals {
    let depression = score_of(entries, "depression");
    let sadness = score_of(entries, "sadness");
    let guilt = score_of(entries, "guilt");
    let fear = score_of(entries, "fear");
    let anger = score_of(entries, "anger");
    let neg_total = depression + sadness + guilt + fear + anger;

    let risk_level = if depression > 0.5 || (depression > 0.3 && sadness > 0.3) {
        RiskLevel::Critical
    } else if neg_total > 0.6 || depression > 0.3 {
        RiskLevel::Alert
    } else if neg_total > 0.4 || overall == Sentiment::Negative {
        RiskLevel::Watch
    } else {
        RiskLevel::Normal
    };

    ServiceSignals {
        need_empathy: overall != Sentiment::Positive || neg_total > 0.3,
        need_routine_recommend: overall != Sentiment::Positive || neg_total > 0.2,
        need_health_check: depression > 0.3 || sadness > 0.4 || guilt > 0.3,
        need_voice_analysis: fear > 0.3 || anger > 0.4,
        risk_level,
    }
}

/// Primary emotion from the sorted entries (which are never empty).
pub fn primary_emotion(sorted: &[&RepairedEntry]) -> PrimaryEmotion {
    let top = sorted[0];
    let second_score = sorted.get(1).map(|e| e.score).unwrap_or(0.0);
    PrimaryEmotion {
        code: top.code.to_string(),
        name_ko: top.name_ko.to_string(),
        group: top.group,
        intensity: intensity(top.score),
        confidence: confidence(top.score, second_score),
    }
}

/// Up to 3 runner-up emotions scoring above the floor threshold.
pub fn secondary_emotions(sorted: &[&RepairedEntry]) -> Vec<SecondaryEmotion> {
    sorted
        .iter()
        .skip(1)
        .filter(|e| e.score > SECONDARY_MIN_SCORE)
        .take(MAX_SECONDARIES)
        .map(|e| SecondaryEmotion {
            code: e.code.to_string(),
            name_ko: e.name_ko.to_string(),
            intensity: intensity(e.score),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repair::{normalize, repair};
    use serde_json::json;

    fn normalized(pairs: &[(&str, f64)]) -> Vec<RepairedEntry> {
        let items: Vec<serde_json::Value> = pairs
            .iter()
            .map(|(code, score)| json!({"code": code, "score": score}))
            .collect();
        let mut repaired = repair(&json!({ "raw_distribution": items }));
        normalize(&mut repaired.entries);
        repaired.entries
    }

    #[test]
    fn intensity_thresholds() {
        assert_eq!(intensity(0.75), 5);
        assert_eq!(intensity(0.70), 5);
        assert_eq!(intensity(0.50), 4);
        assert_eq!(intensity(0.30), 3);
        assert_eq!(intensity(0.10), 2);
        assert_eq!(intensity(0.05), 1);
    }

    #[test]
    fn intensity_is_monotone() {
        let scores = [0.0, 0.05, 0.1, 0.2, 0.25, 0.4, 0.45, 0.6, 0.7, 0.9];
        for pair in scores.windows(2) {
            assert!(intensity(pair[0]) <= intensity(pair[1]));
        }
    }

    #[test]
    fn confidence_uncontested_is_capped() {
        assert_eq!(confidence(0.9, 0.0), 0.95);
    }

    #[test]
    fn confidence_bounds_and_rounding() {
        let c = confidence(0.6, 0.3);
        assert!(c >= 0.55 && c <= 0.95);
        assert_eq!((c * 100.0).round() / 100.0, c);
    }

    #[test]
    fn confidence_grows_with_gap() {
        assert!(confidence(0.6, 0.1) >= confidence(0.6, 0.5));
    }

    #[test]
    fn sentiment_bands() {
        let pos = normalized(&[("joy", 0.8), ("sadness", 0.2)]);
        assert_eq!(sentiment(&pos), Sentiment::Positive);

        let neg = normalized(&[("sadness", 0.8), ("joy", 0.2)]);
        assert_eq!(sentiment(&neg), Sentiment::Negative);

        let mixed = normalized(&[("joy", 0.5), ("sadness", 0.5)]);
        assert_eq!(sentiment(&mixed), Sentiment::Neutral);
    }

    #[test]
    fn secondaries_respect_threshold_and_cap() {
        let entries = normalized(&[
            ("sadness", 0.5),
            ("depression", 0.2),
            ("guilt", 0.15),
            ("fear", 0.1),
            ("anger", 0.05),
        ]);
        let sorted = sorted_entries(&entries);
        assert_eq!(sorted[0].code, "sadness");

        let secondaries = secondary_emotions(&sorted);
        assert_eq!(secondaries.len(), 3);
        assert_eq!(secondaries[0].code, "depression");
        assert!(secondaries.iter().all(|s| s.code != "anger"));
    }

    #[test]
    fn equal_scores_break_ties_by_taxonomy_order() {
        let entries = normalized(&[("sadness", 0.5), ("anger", 0.5)]);
        let sorted = sorted_entries(&entries);
        // sadness precedes anger in the canonical order
        assert_eq!(sorted[0].code, "sadness");
    }

    #[test]
    fn high_depression_is_critical() {
        let entries = normalized(&[("depression", 0.6), ("sadness", 0.3)]);
        let signals = service_signals(&entries, sentiment(&entries));
        assert_eq!(signals.risk_level, RiskLevel::Critical);
        assert!(signals.need_empathy);
        assert!(signals.need_health_check);
    }

    #[test]
    fn joyful_distribution_is_normal_risk() {
        let entries = normalized(&[("joy", 0.8), ("interest", 0.15)]);
        let signals = service_signals(&entries, sentiment(&entries));
        assert_eq!(signals.risk_level, RiskLevel::Normal);
        assert!(!signals.need_empathy);
        assert!(!signals.need_health_check);
        assert!(!signals.need_voice_analysis);
    }

    #[test]
    fn anger_triggers_voice_analysis() {
        let entries = normalized(&[("anger", 0.6), ("discontent", 0.3)]);
        let signals = service_signals(&entries, sentiment(&entries));
        assert!(signals.need_voice_analysis);
    }
}
