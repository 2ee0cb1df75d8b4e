// src/normalizer/embedded.rs
// JSON embedded as a string inside a model's message

use serde_json::Value;

const FENCE: &str = "```";

/// Parses `text` as JSON, then as a fenced code block, then as the span
/// between the first `{` and the last `}`.
pub fn parse_embedded_json(text: &str) -> Option<Value> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return Some(value);
    }

    if let Some(unfenced) = strip_code_fence(trimmed) {
        if let Ok(value) = serde_json::from_str::<Value>(&unfenced) {
            return Some(value);
        }
    }

    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str::<Value>(&trimmed[start..=end]).ok()
}

/// Drops the opening fence line and, if present, the closing one
fn strip_code_fence(text: &str) -> Option<String> {
    if !text.starts_with(FENCE) {
        return None;
    }

    let mut lines: Vec<&str> = text.lines().skip(1).collect();
    if lines
        .last()
        .map(|line| line.trim().starts_with(FENCE))
        .unwrap_or(false)
    {
        lines.pop();
    }

    Some(lines.join("\n").trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plain_json() {
        assert_eq!(
            parse_embedded_json("  {\"a\":1}  "),
            Some(json!({"a": 1}))
        );
    }

    #[test]
    fn test_fenced_json() {
        let text = "```json\n{\"translation\":\"你好\"}\n```";
        assert_eq!(parse_embedded_json(text), Some(json!({"translation": "你好"})));

        let unterminated = "```\n{\"concise\":\"ok\"}";
        assert_eq!(parse_embedded_json(unterminated), Some(json!({"concise": "ok"})));
    }

    #[test]
    fn test_brace_span() {
        let text = "Sure! Here is the result: {\"notes\":\"none\"} Hope it helps.";
        assert_eq!(parse_embedded_json(text), Some(json!({"notes": "none"})));
    }

    #[test]
    fn test_not_json() {
        assert_eq!(parse_embedded_json("just a sentence"), None);
        assert_eq!(parse_embedded_json("} backwards {"), None);
        assert_eq!(parse_embedded_json("   "), None);
    }
}
