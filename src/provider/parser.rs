//! JSON recovery from unreliable backend output.
//!
//! Backends rarely return clean JSON: the payload may arrive wrapped in the
//! backend's envelope, fenced in a markdown code block, or surrounded by
//! prose. [`extract_json`] runs an ordered fallback ladder over those cases:
//!
//! 1. direct parse of the trimmed text;
//! 2. envelope unwrap (backend-specific), then re-run 3-5 on the inner text;
//! 3. fenced ```json block extraction;
//! 4. first balanced `{...}` substring (best-effort heuristic, can
//!    mis-extract on multi-object text);
//! 5. parse failure carrying a bounded preview of the offending text.

use crate::provider::backend::Backend;
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

/// Maximum characters of offending text carried in a [`ParseFailure`].
pub const PREVIEW_CHARS: usize = 200;

/// All fallbacks exhausted; `preview` is a bounded prefix of the text that
/// could not be parsed, never the full string.
#[derive(Debug, Clone, thiserror::Error)]
#[error("no JSON value could be extracted: {preview}")]
pub struct ParseFailure {
    pub preview: String,
}

fn fence_regex() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| {
        // (?s) so the fenced body may span lines; lazy body match stops at the
        // first closing fence.
        Regex::new(r"(?s)```(?:json)?\s*(.*?)```").expect("fence regex is valid")
    })
}

/// Truncates to a character-bounded preview for error messages.
pub fn preview(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max_chars).collect();
        format!("{cut}...")
    }
}

/// Recovers a JSON value from raw backend output via the fallback ladder.
pub fn extract_json(backend: &Backend, raw: &str) -> Result<Value, ParseFailure> {
    let trimmed = raw.trim();

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        // A successful parse may still be the backend's envelope rather than
        // the payload; unwrap and re-run the loose ladder on the inner text.
        if let Some(inner) = backend.unwrap_envelope(&value) {
            return extract_loose(inner.trim());
        }
        return Ok(value);
    }

    extract_loose(trimmed)
}

/// Backend-agnostic tail of the ladder: direct parse, fence strip, brace scan.
fn extract_loose(text: &str) -> Result<Value, ParseFailure> {
    if let Ok(value) = serde_json::from_str::<Value>(text) {
        return Ok(value);
    }

    if let Some(captures) = fence_regex().captures(text)
        && let Some(body) = captures.get(1)
        && let Ok(value) = serde_json::from_str::<Value>(body.as_str().trim())
    {
        return Ok(value);
    }

    if let Some(candidate) = first_balanced_object(text)
        && let Ok(value) = serde_json::from_str::<Value>(candidate)
    {
        return Ok(value);
    }

    Err(ParseFailure {
        preview: preview(text, PREVIEW_CHARS),
    })
}

/// Finds the first balanced `{...}` substring, tracking string literals and
/// escapes so braces inside JSON strings do not unbalance the scan.
fn first_balanced_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn plain_json_is_returned_unchanged() {
        let value = extract_json(&Backend::Codex, r#"{"name":"Ada","skills":["rust"]}"#).unwrap();
        assert_eq!(value, json!({"name": "Ada", "skills": ["rust"]}));
    }

    #[test]
    fn fenced_json_equals_parsing_the_fenced_content() {
        let raw = "```json\n{\"summary\":\"hi\"}\n```";
        let value = extract_json(&Backend::Codex, raw).unwrap();
        assert_eq!(value, json!({"summary": "hi"}));

        // Unlabelled fences work too.
        let raw = "```\n{\"a\":2}\n```";
        assert_eq!(extract_json(&Backend::Codex, raw).unwrap(), json!({"a": 2}));
    }

    #[test]
    fn claude_envelope_then_fence_then_parse() {
        let raw = r#"{"type":"result","result":"```json\n{\"a\":1}\n```"}"#;
        let value = extract_json(&Backend::Claude, raw).unwrap();
        assert_eq!(value, json!({"a": 1}));
    }

    #[test]
    fn gemini_envelope_with_plain_inner_json() {
        let raw = r#"{"response":"{\"b\":2}"}"#;
        let value = extract_json(&Backend::Gemini, raw).unwrap();
        assert_eq!(value, json!({"b": 2}));
    }

    #[test]
    fn envelope_is_not_unwrapped_for_other_backends() {
        // Codex has no envelope, so the wrapper object itself is the payload.
        let raw = r#"{"type":"result","result":"text"}"#;
        let value = extract_json(&Backend::Codex, raw).unwrap();
        assert_eq!(value, json!({"type": "result", "result": "text"}));
    }

    #[test]
    fn json_surrounded_by_prose_is_recovered_by_brace_scan() {
        let raw = "Here is the tailored content:\n{\"title\":\"Engineer\"}\nLet me know!";
        let value = extract_json(&Backend::Claude, raw).unwrap();
        assert_eq!(value, json!({"title": "Engineer"}));
    }

    #[test]
    fn brace_scan_survives_braces_inside_strings() {
        let raw = "note {\"text\":\"uses { and } freely\"} trailing";
        let value = extract_json(&Backend::Codex, raw).unwrap();
        assert_eq!(value, json!({"text": "uses { and } freely"}));
    }

    #[test]
    fn unparseable_text_fails_with_bounded_preview() {
        let raw = "x".repeat(5_000);
        let err = extract_json(&Backend::Claude, &raw).unwrap_err();
        assert!(err.preview.starts_with("xxx"));
        assert!(err.preview.len() <= PREVIEW_CHARS + 3);
        assert!(err.preview.len() < raw.len());
    }

    #[test]
    fn short_unparseable_text_keeps_full_preview() {
        let err = extract_json(&Backend::Claude, "not json at all").unwrap_err();
        assert_eq!(err.preview, "not json at all");
    }
}
