//! Noise and safety gate for combined session text.
//!
//! Emergency keywords win over every noise rule: a message like
//! "안녕, 나 이제 끝낼래" must never be skipped because it starts with a
//! greeting.

use once_cell::sync::Lazy;
use regex::Regex;

/// Gate verdict for a combined session text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Analyze normally.
    Proceed,
    /// Noise; mark the session analyzed without producing a result.
    Skip,
    /// Distress signal; analyze with priority no matter how short.
    Emergency,
}

/// Self-harm, suicide and extreme-distress signals plus help requests.
/// Partial match on purpose: "죽고" catches "죽고 싶어" and variants.
static EMERGENCY_KEYWORDS: &[&str] = &[
    "죽고", "자살", "자해", "끝내", "사라지",
    "힘들", "우울", "불안", "괴로", "고통",
    "못 살", "살기 싫", "의미 없", "포기",
    "도와줘", "살려줘", "SOS",
];

/// Jamo-only filler like "ㅎㅎㅎ" or "ㅋㅋ!!".
static JAMO_NOISE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[ㄱ-ㅎㅏ-ㅣ\s.!?]+$").unwrap());

/// Replies that carry no analyzable emotion on their own.
static MEANINGLESS_EXACT: &[&str] = &[
    "안녕", "ㅎㅎ", "ㅋㅋ", "네", "응", "ㅇㅇ", "ㄴㄴ", "okay", "ok", "yes", "no",
];

/// Classify a combined session text.
pub fn gate(combined_text: &str) -> GateDecision {
    let stripped = combined_text.trim();

    if EMERGENCY_KEYWORDS.iter().any(|kw| stripped.contains(kw)) {
        return GateDecision::Emergency;
    }

    if !stripped.is_empty() && JAMO_NOISE.is_match(stripped) {
        return GateDecision::Skip;
    }

    let lowered = stripped.to_lowercase();
    if MEANINGLESS_EXACT.iter().any(|m| lowered == *m) {
        return GateDecision::Skip;
    }

    if stripped.chars().count() < 3 {
        return GateDecision::Skip;
    }

    GateDecision::Proceed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normal_text_proceeds() {
        assert_eq!(gate("오늘 회사에서 너무 답답한 일이 있었어요"), GateDecision::Proceed);
    }

    #[test]
    fn jamo_noise_is_skipped() {
        assert_eq!(gate("ㅎㅎㅎ"), GateDecision::Skip);
        assert_eq!(gate("ㅋㅋㅋ!!"), GateDecision::Skip);
        assert_eq!(gate("ㅏㅏㅏ..."), GateDecision::Skip);
    }

    #[test]
    fn meaningless_exact_is_skipped() {
        assert_eq!(gate("안녕"), GateDecision::Skip);
        assert_eq!(gate("네"), GateDecision::Skip);
        assert_eq!(gate("OK"), GateDecision::Skip);
        assert_eq!(gate("  응  "), GateDecision::Skip);
    }

    #[test]
    fn meaningless_prefix_is_not_skipped() {
        // Exact match only; longer sentences starting the same way proceed.
        assert_eq!(gate("안녕하세요 오늘 기분이 이상해요"), GateDecision::Proceed);
    }

    #[test]
    fn ultra_short_is_skipped() {
        assert_eq!(gate("아"), GateDecision::Skip);
        assert_eq!(gate("음?"), GateDecision::Skip);
        assert_eq!(gate(""), GateDecision::Skip);
    }

    #[test]
    fn emergency_beats_every_noise_rule() {
        assert_eq!(gate("죽고 싶어"), GateDecision::Emergency);
        assert_eq!(gate("안녕, 나 이제 끝낼래"), GateDecision::Emergency);
        assert_eq!(gate("포기"), GateDecision::Emergency);
        assert_eq!(gate("SOS"), GateDecision::Emergency);
    }

    #[test]
    fn emergency_with_distress_terms() {
        assert_eq!(gate("요즘 너무 힘들어요"), GateDecision::Emergency);
        assert_eq!(gate("계속 우울해"), GateDecision::Emergency);
    }
}
