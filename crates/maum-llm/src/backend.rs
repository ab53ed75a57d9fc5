//! Completion backend trait.

use std::future::Future;

use maum_core::Result;

/// A chat-completion backend that answers with a JSON document.
///
/// Implemented by `OpenAiClient` for production and by scripted fakes in
/// tests. Generic (not `dyn`) at the call sites so the futures stay
/// nameable and fakes need no boxing.
pub trait CompletionBackend: Send + Sync {
    /// Send one system + user prompt pair and return the raw completion
    /// text. Callers parse; the backend only transports.
    fn complete_json(
        &self,
        system: &str,
        user: &str,
    ) -> impl Future<Output = Result<String>> + Send;
}

/// Strip a Markdown code fence wrapping, if present.
///
/// Some models wrap JSON-mode output in ```json ... ``` despite the
/// response-format hint.
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(rest) = rest.strip_suffix("```") else {
        return trimmed;
    };
    // Drop the language tag on the opening fence line.
    match rest.find('\n') {
        Some(pos) => rest[pos + 1..].trim(),
        None => rest.trim(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_json_passes_through() {
        assert_eq!(strip_code_fences(r#"{"a": 1}"#), r#"{"a": 1}"#);
    }

    #[test]
    fn json_fence_is_removed() {
        let fenced = "```json\n{\"a\": 1}\n```";
        assert_eq!(strip_code_fences(fenced), "{\"a\": 1}");
    }

    #[test]
    fn bare_fence_is_removed() {
        let fenced = "```\n{\"a\": 1}\n```";
        assert_eq!(strip_code_fences(fenced), "{\"a\": 1}");
    }

    #[test]
    fn unterminated_fence_is_left_alone() {
        let broken = "```json\n{\"a\": 1}";
        assert_eq!(strip_code_fences(broken), broken);
    }
}
