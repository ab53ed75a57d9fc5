//! Response-style, routine-tag and report-tag lookup tables.
//!
//! Pure functions of the derived primary/secondary emotions and sentiment.
//! No persistence, no network: downstream services key off these strings,
//! so the tables stay short and stable.

use maum_core::taxonomy::EmotionGroup;
use maum_core::{PrimaryEmotion, SecondaryEmotion, Sentiment};

const MAX_STYLES: usize = 3;
const MAX_ROUTINE_TAGS: usize = 3;
const MAX_REPORT_TAGS: usize = 5;

fn dedup_truncate(mut items: Vec<String>, max: usize) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    items.retain(|s| seen.insert(s.clone()));
    items.truncate(max);
    items
}

fn code_style(code: &str) -> Option<&'static str> {
    Some(match code {
        "depression" | "sadness" => "따뜻하게 위로하는 답변",
        "anger" | "contempt" => "차분하게 진정시키는 답변",
        "fear" => "안심시키고 안정감을 주는 답변",
        "guilt" | "shame" => "자책을 덜어주는 답변",
        "confusion" => "생각을 정리하도록 돕는 답변",
        "joy" | "excitement" => "긍정적인 감정을 함께 기뻐하는 답변",
        _ => return None,
    })
}

/// Recommended response styles, at most 3.
pub fn response_styles(primary: &PrimaryEmotion, overall: Sentiment) -> Vec<String> {
    let mut styles = Vec::new();
    if let Some(lead) = code_style(&primary.code) {
        styles.push(lead.to_string());
    }
    match overall {
        Sentiment::Positive => {
            styles.push("밝고 가벼운 어조".into());
            styles.push("긍정 경험을 이어가도록 격려하는 방식".into());
        }
        Sentiment::Neutral => {
            styles.push("차분하고 중립적인 어조".into());
            styles.push("감정을 확인하는 질문 중심".into());
        }
        Sentiment::Negative => {
            styles.push("부드럽고 공감 중심의 답변".into());
            styles.push("비난 없이 감정을 받아주는 방식".into());
        }
    }
    dedup_truncate(styles, MAX_STYLES)
}

fn code_routines(code: &str) -> &'static [&'static str] {
    match code {
        "joy" => &["sunlight_walk", "gratitude_note"],
        "excitement" => &["journaling", "light_walk"],
        "confidence" => &["goal_setting", "journaling"],
        "love" => &["gratitude_note", "journaling"],
        "relief" => &["stretching", "meditation"],
        "enlightenment" => &["journaling", "meditation"],
        "interest" => &["light_walk", "journaling"],
        "discontent" => &["breathing", "light_walk"],
        "shame" => &["journaling", "meditation"],
        "sadness" => &["breathing", "meditation", "light_walk"],
        "guilt" => &["journaling", "breathing"],
        "depression" => &["breathing", "sunlight_walk", "meditation"],
        "boredom" => &["light_walk", "stretching"],
        "contempt" => &["breathing", "meditation"],
        "anger" => &["breathing", "stretching"],
        "fear" => &["breathing", "meditation"],
        "confusion" => &["meditation", "journaling"],
        _ => &[],
    }
}

/// Recommended routine tags, at most 3.
pub fn routine_tags(primary: &PrimaryEmotion, overall: Sentiment) -> Vec<String> {
    let mut tags: Vec<String> = code_routines(&primary.code)
        .iter()
        .map(|t| t.to_string())
        .collect();
    // Maintenance fallback keeps the list non-empty for every input.
    if overall == Sentiment::Positive {
        tags.push("gratitude_note".into());
    } else {
        tags.push("breathing".into());
    }
    dedup_truncate(tags, MAX_ROUTINE_TAGS)
}

/// Report tags, at most 5.
pub fn report_tags(
    primary: &PrimaryEmotion,
    secondaries: &[SecondaryEmotion],
    overall: Sentiment,
) -> Vec<String> {
    let mut tags = vec![format!("{} 경향", primary.name_ko)];
    if primary.intensity >= 4 {
        tags.push(format!("{} 심화", primary.name_ko));
    }
    for secondary in secondaries {
        tags.push(format!("{} 동반", secondary.name_ko));
    }
    match overall {
        Sentiment::Positive => tags.push("긍정 정서 우세".into()),
        Sentiment::Negative => tags.push("부정 정서 우세".into()),
        Sentiment::Neutral => {}
    }
    if primary.group == EmotionGroup::Negative && primary.intensity >= 4 {
        tags.push("정서 관리 필요".into());
    }
    dedup_truncate(tags, MAX_REPORT_TAGS)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn primary(code: &str, name_ko: &str, group: EmotionGroup, intensity: u8) -> PrimaryEmotion {
        PrimaryEmotion {
            code: code.into(),
            name_ko: name_ko.into(),
            group,
            intensity,
            confidence: 0.8,
        }
    }

    #[test]
    fn styles_are_capped_and_deduped() {
        let p = primary("depression", "우울", EmotionGroup::Negative, 4);
        let styles = response_styles(&p, Sentiment::Negative);
        assert!(!styles.is_empty() && styles.len() <= 3);
        let unique: std::collections::HashSet<_> = styles.iter().collect();
        assert_eq!(unique.len(), styles.len());
    }

    #[test]
    fn routine_tags_never_empty() {
        for def in maum_core::TAXONOMY.iter() {
            let p = primary(def.code, def.name_ko, def.group, 3);
            let tags = routine_tags(&p, Sentiment::Neutral);
            assert!(!tags.is_empty() && tags.len() <= 3, "code {}", def.code);
        }
    }

    #[test]
    fn positive_primary_gets_maintenance_tags() {
        let p = primary("joy", "기쁨", EmotionGroup::Positive, 4);
        let tags = routine_tags(&p, Sentiment::Positive);
        assert!(tags.contains(&"gratitude_note".to_string()));
    }

    #[test]
    fn report_tags_name_primary_and_secondaries() {
        let p = primary("confusion", "혼란", EmotionGroup::Negative, 3);
        let secondaries = vec![SecondaryEmotion {
            code: "sadness".into(),
            name_ko: "슬픔".into(),
            intensity: 2,
        }];
        let tags = report_tags(&p, &secondaries, Sentiment::Negative);
        assert!(tags.contains(&"혼란 경향".to_string()));
        assert!(tags.contains(&"슬픔 동반".to_string()));
        assert!(tags.len() <= 5);
    }

    #[test]
    fn intense_negative_primary_flags_management() {
        let p = primary("depression", "우울", EmotionGroup::Negative, 5);
        let tags = report_tags(&p, &[], Sentiment::Negative);
        assert!(tags.contains(&"우울 심화".to_string()));
        assert!(tags.contains(&"정서 관리 필요".to_string()));
    }
}
