//! Prompt construction for the emotion-distribution completion.

use maum_core::taxonomy::TAXONOMY;
use maum_store::KbHit;

/// System prompt: fixes the 17 codes and the single-object output shape.
pub fn system_prompt() -> String {
    let code_lines: String = TAXONOMY
        .iter()
        .map(|def| format!("- {} ({})\n", def.code, def.name_ko))
        .collect();

    format!(
        "당신은 한국어 텍스트의 감정을 분석하는 전문가입니다.\n\
         아래 17개 감정 코드만 사용하세요:\n{code_lines}\
         \n\
         출력은 반드시 다음 형태의 단일 JSON 객체여야 합니다:\n\
         {{\"raw_distribution\": [{{\"code\": \"...\", \"score\": 0.0}}, ...]}}\n\
         \n\
         규칙:\n\
         1. score는 각 감정의 상대적 강도입니다. 합이 대략 1.0이면 충분하며 정확할 필요는 없습니다 (서버가 정규화합니다).\n\
         2. 감지되지 않은 감정은 생략해도 됩니다.\n\
         3. 다른 최상위 필드나 설명 문장을 추가하지 마세요. JSON만 출력하세요."
    )
}

/// User prompt: the text under analysis plus KB reference snippets.
pub fn user_prompt(text: &str, context: &[KbHit]) -> String {
    let mut prompt = String::new();

    if !context.is_empty() {
        prompt.push_str("참고 - 유사한 감정 표현:\n");
        for (i, hit) in context.iter().enumerate() {
            prompt.push_str(&format!(
                "{}. \"{}\" (감정: {}, 강도: {})\n",
                i + 1,
                hit.text,
                hit.emotion_code,
                hit.intensity
            ));
        }
        prompt.push('\n');
    }

    prompt.push_str("이제 다음 텍스트를 분석하세요. JSON만 출력하세요:\n");
    prompt.push_str(text);
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_prompt_names_all_codes() {
        let prompt = system_prompt();
        for def in TAXONOMY.iter() {
            assert!(prompt.contains(def.code), "missing code {}", def.code);
        }
        assert!(prompt.contains("raw_distribution"));
    }

    #[test]
    fn user_prompt_includes_context_snippets() {
        let ctx = vec![KbHit {
            text: "너무 슬퍼요".into(),
            emotion_code: "sadness".into(),
            intensity: 4,
            distance: 0.12,
        }];
        let prompt = user_prompt("오늘 하루가 너무 길었어요", &ctx);
        assert!(prompt.contains("너무 슬퍼요"));
        assert!(prompt.contains("sadness"));
        assert!(prompt.contains("오늘 하루가 너무 길었어요"));
    }

    #[test]
    fn user_prompt_without_context_has_no_reference_header() {
        let prompt = user_prompt("그냥 그래요", &[]);
        assert!(!prompt.contains("참고"));
    }
}
