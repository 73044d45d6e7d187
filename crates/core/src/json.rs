//! Tolerant JSON handling for model output.
//!
//! Two entry points:
//! - [`extract_json`] — pull the structured answer out of a final model
//!   message (fenced block → largest brace span → `{"answer": text}`).
//! - [`lenient_decode`] — decode generator output with a repair ladder:
//!   strip fences → strict parse → balance braces/brackets →
//!   truncation-suffix heuristics → fail.
//!
//! Both are pure and independent of any network call.

use serde_json::Value;

use crate::error::JsonRepairError;

/// How many truncation points are tried before giving up.
const MAX_TRUNCATION_ATTEMPTS: usize = 16;

/// Extract the JSON payload of a final model answer.
///
/// Never fails: text without parseable JSON becomes `{"answer": text}`.
pub fn extract_json(text: &str) -> Value {
    if let Some(block) = fenced_block(text) {
        if let Ok(value) = serde_json::from_str::<Value>(block.trim()) {
            return value;
        }
    }

    if let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) {
        if start < end {
            if let Ok(value) = serde_json::from_str::<Value>(&text[start..=end]) {
                return value;
            }
        }
    }

    serde_json::json!({ "answer": text.trim() })
}

/// Decode possibly-damaged JSON emitted by a generator.
pub fn lenient_decode(text: &str) -> Result<Value, JsonRepairError> {
    let stripped = strip_fences(text);
    let trimmed = stripped.trim();
    if trimmed.is_empty() {
        return Err(JsonRepairError::Empty);
    }

    let start = trimmed
        .find(['{', '['])
        .ok_or_else(|| JsonRepairError::Unrecoverable("no object or array found".into()))?;
    let candidate = &trimmed[start..];

    if let Some(value) = parse_first(candidate) {
        return Ok(value);
    }

    let balanced = balance(candidate);
    if let Ok(value) = serde_json::from_str::<Value>(&balanced) {
        tracing::debug!("Repaired JSON by balancing delimiters");
        return Ok(value);
    }

    for cut in cut_points(candidate).into_iter().rev().take(MAX_TRUNCATION_ATTEMPTS) {
        let repaired = balance(&candidate[..cut]);
        if let Ok(value) = serde_json::from_str::<Value>(&repaired) {
            tracing::debug!(cut, "Repaired JSON by dropping a truncated suffix");
            return Ok(value);
        }
    }

    Err(JsonRepairError::Unrecoverable(format!(
        "could not repair {} bytes of output",
        candidate.len()
    )))
}

/// Body of the first Markdown code fence, if there is one.
///
/// An unclosed fence (truncated output) yields everything after the opener.
fn fenced_block(text: &str) -> Option<&str> {
    let open = text.find("```")?;
    let after_ticks = &text[open + 3..];
    // Skip the language tag line ("json", "JSON", ...)
    let body_start = after_ticks.find('\n').map(|i| i + 1).unwrap_or(0);
    let body = &after_ticks[body_start..];
    Some(match body.find("```") {
        Some(close) => &body[..close],
        None => body,
    })
}

fn strip_fences(text: &str) -> &str {
    fenced_block(text).unwrap_or(text)
}

/// Parse the first JSON value in `text`, ignoring trailing prose.
fn parse_first(text: &str) -> Option<Value> {
    serde_json::Deserializer::from_str(text)
        .into_iter::<Value>()
        .next()
        .and_then(|r| r.ok())
}

/// Close an unterminated string, drop dangling separators and trailing
/// commas, and append the missing closers.
fn balance(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 8);
    let mut stack: Vec<char> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for ch in text.chars() {
        if in_string {
            out.push(ch);
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => {
                in_string = true;
                out.push(ch);
            }
            '{' => {
                stack.push('}');
                out.push(ch);
            }
            '[' => {
                stack.push(']');
                out.push(ch);
            }
            '}' | ']' => {
                trim_trailing_separator(&mut out);
                if stack.last() == Some(&ch) {
                    stack.pop();
                }
                out.push(ch);
            }
            _ => out.push(ch),
        }
    }

    if in_string {
        if escaped {
            out.pop();
        }
        out.push('"');
    }
    trim_trailing_separator(&mut out);
    while let Some(closer) = stack.pop() {
        out.push(closer);
    }
    out
}

fn trim_trailing_separator(out: &mut String) {
    loop {
        let trimmed_len = out.trim_end().len();
        out.truncate(trimmed_len);
        match out.chars().last() {
            Some(',') | Some(':') => {
                out.pop();
            }
            _ => break,
        }
    }
}

/// Byte offsets where a truncated document can be cut: before every comma
/// and after every opener that sit outside strings.
fn cut_points(text: &str) -> Vec<usize> {
    let mut points = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for (i, ch) in text.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            ',' => points.push(i),
            '{' | '[' => points.push(i + 1),
            _ => {}
        }
    }
    points
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extract_prefers_fenced_block() {
        let text = "Here is the plan:\n```json\n{\"intent\": \"verify\"}\n```\nthanks {not json}";
        assert_eq!(extract_json(text), json!({"intent": "verify"}));
    }

    #[test]
    fn extract_falls_back_to_brace_span() {
        let text = "Result: {\"items\": [1, 2]} — done";
        assert_eq!(extract_json(text), json!({"items": [1, 2]}));
    }

    #[test]
    fn extract_wraps_plain_text() {
        assert_eq!(extract_json("今天休息一下吧"), json!({"answer": "今天休息一下吧"}));
    }

    #[test]
    fn decode_strict_with_trailing_prose() {
        let value = lenient_decode("{\"a\": 1} and some notes").unwrap();
        assert_eq!(value, json!({"a": 1}));
    }

    #[test]
    fn decode_strips_fences() {
        let value = lenient_decode("```json\n[{\"stem\": \"1+1\"}]\n```").unwrap();
        assert_eq!(value, json!([{"stem": "1+1"}]));
    }

    #[test]
    fn decode_balances_unclosed_delimiters() {
        let value = lenient_decode("{\"items\": [{\"stem\": \"2+2\"}, {\"stem\": \"3+3\"}").unwrap();
        assert_eq!(value["items"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn decode_closes_truncated_string() {
        let value = lenient_decode("{\"analysis\": \"孩子在分数加法上").unwrap();
        assert_eq!(value["analysis"], "孩子在分数加法上");
    }

    #[test]
    fn decode_drops_trailing_commas() {
        let value = lenient_decode("{\"a\": [1, 2, ], }").unwrap();
        assert_eq!(value, json!({"a": [1, 2]}));
    }

    #[test]
    fn decode_drops_truncated_key() {
        let value = lenient_decode("{\"material\": {\"title\": \"春\"}, \"items\": [{\"stem\": \"x\", \"ans").unwrap();
        assert_eq!(value["material"]["title"], "春");
    }

    #[test]
    fn decode_fails_without_json() {
        assert_eq!(lenient_decode("   "), Err(JsonRepairError::Empty));
        assert!(matches!(lenient_decode("no braces here"), Err(JsonRepairError::Unrecoverable(_))));
    }
}
