//! The fixed 17-emotion taxonomy.
//!
//! Codes are stable identifiers used as primary keys throughout the pipeline:
//! in LLM prompts and responses, persisted analysis rows, KB entries and
//! cache metadata. Changing this table bumps `TAXONOMY_VERSION`, which
//! invalidates the emotion-context KB and forces a rebuild from seed.

use serde::{Deserialize, Serialize};

/// Polarity group of an emotion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmotionGroup {
    Positive,
    Negative,
}

/// One taxonomy entry.
#[derive(Debug, Clone, Copy)]
pub struct EmotionDef {
    pub code: &'static str,
    pub name_ko: &'static str,
    pub group: EmotionGroup,
}

/// Bumped whenever the code list changes. v1 was the legacy 10-code set.
pub const TAXONOMY_VERSION: u32 = 2;

pub const EMOTION_COUNT: usize = 17;

/// Canonical order: 7 positive, then 10 negative.
pub const TAXONOMY: [EmotionDef; EMOTION_COUNT] = [
    EmotionDef { code: "joy", name_ko: "기쁨", group: EmotionGroup::Positive },
    EmotionDef { code: "excitement", name_ko: "설렘", group: EmotionGroup::Positive },
    EmotionDef { code: "confidence", name_ko: "자신감", group: EmotionGroup::Positive },
    EmotionDef { code: "love", name_ko: "사랑", group: EmotionGroup::Positive },
    EmotionDef { code: "relief", name_ko: "안도", group: EmotionGroup::Positive },
    EmotionDef { code: "enlightenment", name_ko: "깨달음", group: EmotionGroup::Positive },
    EmotionDef { code: "interest", name_ko: "흥미", group: EmotionGroup::Positive },
    EmotionDef { code: "discontent", name_ko: "불만", group: EmotionGroup::Negative },
    EmotionDef { code: "shame", name_ko: "수치심", group: EmotionGroup::Negative },
    EmotionDef { code: "sadness", name_ko: "슬픔", group: EmotionGroup::Negative },
    EmotionDef { code: "guilt", name_ko: "죄책감", group: EmotionGroup::Negative },
    EmotionDef { code: "depression", name_ko: "우울", group: EmotionGroup::Negative },
    EmotionDef { code: "boredom", name_ko: "지루함", group: EmotionGroup::Negative },
    EmotionDef { code: "contempt", name_ko: "경멸", group: EmotionGroup::Negative },
    EmotionDef { code: "anger", name_ko: "분노", group: EmotionGroup::Negative },
    EmotionDef { code: "fear", name_ko: "두려움", group: EmotionGroup::Negative },
    EmotionDef { code: "confusion", name_ko: "혼란", group: EmotionGroup::Negative },
];

/// Look up a taxonomy entry by code.
pub fn emotion(code: &str) -> Option<&'static EmotionDef> {
    TAXONOMY.iter().find(|e| e.code == code)
}

/// Whether a code belongs to the current taxonomy.
pub fn is_known(code: &str) -> bool {
    emotion(code).is_some()
}

/// Position of a code in the canonical order. Used as a deterministic
/// tiebreaker when sorting equal scores.
pub fn position(code: &str) -> Option<usize> {
    TAXONOMY.iter().position(|e| e.code == code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn seventeen_unique_codes() {
        let codes: HashSet<&str> = TAXONOMY.iter().map(|e| e.code).collect();
        assert_eq!(codes.len(), EMOTION_COUNT);
    }

    #[test]
    fn seven_positive_ten_negative() {
        let positive = TAXONOMY
            .iter()
            .filter(|e| e.group == EmotionGroup::Positive)
            .count();
        assert_eq!(positive, 7);
        assert_eq!(EMOTION_COUNT - positive, 10);
    }

    #[test]
    fn lookup_by_code() {
        let def = emotion("depression").unwrap();
        assert_eq!(def.name_ko, "우울");
        assert_eq!(def.group, EmotionGroup::Negative);
        assert!(emotion("serenity").is_none());
    }

    #[test]
    fn positions_are_stable() {
        assert_eq!(position("joy"), Some(0));
        assert_eq!(position("confusion"), Some(16));
    }
}
