//! Tool-output summarizers.
//!
//! Outputs longer than the configured threshold are condensed before they
//! are re-injected into the model history. Known tools get a structured
//! digest; anything else, or a digest that is still too long, is truncated.

use edupilot_core::ToolName;
use serde_json::{Value, json};

/// Condense `output` of `tool` to at most `threshold` characters.
///
/// Returns `None` when the output already fits.
pub fn summarize(tool: &str, output: &str, threshold: usize) -> Option<String> {
    if output.chars().count() <= threshold {
        return None;
    }

    let digest = serde_json::from_str::<Value>(output)
        .ok()
        .and_then(|value| match tool.parse::<ToolName>().ok()? {
            ToolName::GenerateLearningContent => Some(learning_content(&value)),
            ToolName::GenerateFeedback => Some(feedback(&value)),
            ToolName::GetMasteryStats => Some(mastery(&value)),
            ToolName::GetMemories => Some(memories(&value)),
            _ => None,
        })
        .map(|digest| digest.to_string());

    Some(match digest {
        Some(digest) if digest.chars().count() <= threshold => digest,
        _ => truncate(output, threshold),
    })
}

/// Keep a prefix and note how much was cut.
pub fn truncate(output: &str, threshold: usize) -> String {
    let total = output.chars().count();
    let marker = format!(" …[truncated, {total} chars total]");
    let keep = threshold.saturating_sub(marker.chars().count());
    let mut text: String = output.chars().take(keep).collect();
    text.push_str(&marker);
    text
}

fn shorten(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let mut short: String = text.chars().take(max_chars).collect();
        short.push('…');
        short
    }
}

fn str_at<'a>(value: &'a Value, pointer: &str) -> &'a str {
    value.pointer(pointer).and_then(Value::as_str).unwrap_or_default()
}

fn array_len(value: &Value, key: &str) -> usize {
    value.get(key).and_then(Value::as_array).map_or(0, Vec::len)
}

fn learning_content(value: &Value) -> Value {
    let items = value.get("items").and_then(Value::as_array);
    let stems: Vec<String> = items
        .into_iter()
        .flatten()
        .map(|item| {
            format!(
                "{} [{}] {}",
                str_at(item, "/id"),
                str_at(item, "/type"),
                shorten(str_at(item, "/stem"), 60)
            )
        })
        .collect();
    json!({
        "summarized": true,
        "effective_mode": value.get("effective_mode"),
        "front_mode": value.pointer("/learning_decision/front_mode"),
        "intent": value.pointer("/teaching_intent/type"),
        "question_count": value.get("question_count"),
        "item_count": items.map_or(0, Vec::len),
        "items": stems,
        "rejected_count": array_len(value, "rejected"),
        "analysis": shorten(str_at(value, "/analysis"), 300),
    })
}

fn feedback(value: &Value) -> Value {
    json!({
        "summarized": true,
        "analysis": shorten(str_at(value, "/analysis"), 600),
        "feedback": shorten(&value.get("feedback").map(Value::to_string).unwrap_or_default(), 600),
    })
}

fn point_names(value: &Value, key: &str) -> Vec<String> {
    value
        .get(key)
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .take(5)
        .map(|p| str_at(p, "/name").to_string())
        .collect()
}

fn mastery(value: &Value) -> Value {
    json!({
        "summarized": true,
        "avg_mastery": value.get("avg_mastery"),
        "recent_error_rate": value.get("recent_error_rate"),
        "mastered_ratio": value.get("mastered_ratio"),
        "weakest": point_names(value, "weak_points"),
        "strongest": point_names(value, "strong_points"),
    })
}

fn memories(value: &Value) -> Value {
    let keys: Vec<String> = value
        .get("records")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .map(|r| format!("{}:{}", str_at(r, "/layer"), str_at(r, "/key")))
        .collect();
    json!({
        "summarized": true,
        "count": value.get("count"),
        "keys": keys,
    })
}
