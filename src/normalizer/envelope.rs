// src/normalizer/envelope.rs
// Free-text extraction from vendor response envelopes

use super::ResponseShape;
use serde_json::Value;

/// Message text of the first choice/candidate that has any
pub fn message_text(shape: ResponseShape, root: &Value) -> Option<String> {
    match shape {
        ResponseShape::ChatCompletion => chat_completion_text(root),
        ResponseShape::Gemini => gemini_text(root),
        // Self-hosted backends often proxy one of the two vendor formats
        ResponseShape::Custom => chat_completion_text(root).or_else(|| gemini_text(root)),
    }
}

/// `choices[].message.content` (string or parts array) or `choices[].text`
pub fn chat_completion_text(root: &Value) -> Option<String> {
    root.get("choices")?
        .as_array()?
        .iter()
        .find_map(|choice| {
            choice
                .get("message")
                .and_then(|m| m.get("content"))
                .and_then(content_text)
                .or_else(|| choice.get("text").and_then(non_empty_str))
        })
}

/// `candidates[].content.parts[].text`, first non-empty part in order
pub fn gemini_text(root: &Value) -> Option<String> {
    root.get("candidates")?
        .as_array()?
        .iter()
        .filter_map(|candidate| candidate.get("content")?.get("parts")?.as_array())
        .flatten()
        .find_map(|part| part.get("text").and_then(non_empty_str))
}

fn content_text(content: &Value) -> Option<String> {
    match content {
        Value::String(_) => non_empty_str(content),
        Value::Array(parts) => {
            let joined = parts
                .iter()
                .filter_map(|part| match part {
                    Value::String(s) => Some(s.clone()),
                    _ => part
                        .get("text")
                        .and_then(Value::as_str)
                        .or_else(|| part.get("content").and_then(Value::as_str))
                        .map(str::to_string),
                })
                .filter(|s| !s.trim().is_empty())
                .collect::<Vec<_>>()
                .join("\n");
            (!joined.trim().is_empty()).then_some(joined)
        }
        _ => None,
    }
}

fn non_empty_str(value: &Value) -> Option<String> {
    value
        .as_str()
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
}
