//! Parse and repair of the LLM distribution response.
//!
//! The contract downstream of this module: exactly 17 entries, one per
//! taxonomy code, with finite non-negative scores. Whatever the model
//! returned, repair delivers that shape or an error when there is no JSON
//! at all.

use serde_json::Value;

use maum_core::taxonomy::{EmotionGroup, EMOTION_COUNT, TAXONOMY};
use maum_core::{Error, Result};

/// Floor score for codes the model omitted.
pub(crate) const FLOOR_SCORE: f64 = 0.001;

/// One repaired entry. `filled` marks floor-filled codes so the emitted
/// raw distribution can suppress them.
#[derive(Debug, Clone)]
pub struct RepairedEntry {
    pub code: &'static str,
    pub name_ko: &'static str,
    pub group: EmotionGroup,
    pub score: f64,
    pub filled: bool,
}

/// Outcome of parse + repair, before normalization.
#[derive(Debug)]
pub struct Repaired {
    pub entries: Vec<RepairedEntry>,
    /// True when anything was dropped, coerced or floor-filled.
    pub modified: bool,
}

/// Parse the completion text as JSON; on failure retry with the first
/// `{...}` substring.
pub fn parse_response(raw: &str) -> Result<Value> {
    if let Ok(v) = serde_json::from_str::<Value>(raw.trim()) {
        return Ok(v);
    }
    let start = raw
        .find('{')
        .ok_or_else(|| Error::Parse("no JSON object in LLM response".into()))?;
    let end = raw
        .rfind('}')
        .ok_or_else(|| Error::Parse("unterminated JSON object in LLM response".into()))?;
    if end <= start {
        return Err(Error::Parse("unterminated JSON object in LLM response".into()));
    }
    serde_json::from_str(&raw[start..=end])
        .map_err(|e| Error::Parse(format!("LLM response is not valid JSON: {}", e)))
}

fn coerce_score(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Repair the parsed response into exactly one entry per taxonomy code.
pub fn repair(response: &Value) -> Repaired {
    let raw_entries = response
        .get("raw_distribution")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[]);

    let mut scores: [Option<f64>; EMOTION_COUNT] = [None; EMOTION_COUNT];
    let mut modified = raw_entries.is_empty();

    for item in raw_entries {
        let Some(code) = item.get("code").and_then(Value::as_str) else {
            modified = true;
            continue;
        };
        let Some(pos) = TAXONOMY.iter().position(|d| d.code == code) else {
            // Unknown code, dropped.
            modified = true;
            continue;
        };
        if scores[pos].is_some() {
            // Duplicate, keep first.
            modified = true;
            continue;
        }
        let score = match item.get("score").and_then(coerce_score) {
            Some(s) if s.is_finite() => {
                if s < 0.0 {
                    modified = true;
                    0.0
                } else {
                    s
                }
            }
            _ => {
                modified = true;
                0.0
            }
        };
        scores[pos] = Some(score);
    }

    let entries = TAXONOMY
        .iter()
        .zip(scores.iter())
        .map(|(def, score)| match score {
            Some(s) => RepairedEntry {
                code: def.code,
                name_ko: def.name_ko,
                group: def.group,
                score: *s,
                filled: false,
            },
            None => {
                modified = true;
                RepairedEntry {
                    code: def.code,
                    name_ko: def.name_ko,
                    group: def.group,
                    score: FLOOR_SCORE,
                    filled: true,
                }
            }
        })
        .collect();

    Repaired { entries, modified }
}

/// Normalize scores in place: divide by the sum, or assign 1/17 to every
/// entry when the sum is zero.
pub fn normalize(entries: &mut [RepairedEntry]) {
    let sum: f64 = entries.iter().map(|e| e.score).sum();
    if sum > 0.0 {
        for e in entries.iter_mut() {
            e.score /= sum;
        }
    } else {
        let uniform = 1.0 / entries.len() as f64;
        for e in entries.iter_mut() {
            e.score = uniform;
        }
    }
}
