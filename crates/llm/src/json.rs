//! One parse step per LLM call: strip markdown fences, then
//! `serde_json::from_str` into a tagged response type. Replaces the
//! dynamic-typing-at-JSON-boundaries pattern with explicit variants (§9).

/// Extract JSON from an LLM response, handling markdown code blocks.
pub fn extract_json(response: &str) -> &str {
    let trimmed = response.trim();

    if let Some(start) = trimmed.find("```json") {
        let json_start = start + 7;
        if let Some(end) = trimmed[json_start..].find("```") {
            return trimmed[json_start..json_start + end].trim();
        }
    }

    if let Some(start) = trimmed.find("```") {
        let json_start = start + 3;
        let after_tick = &trimmed[json_start..];
        let content_start = after_tick.find('\n').map_or(0, |n| n + 1);
        if let Some(end) = after_tick[content_start..].find("```") {
            return after_tick[content_start..content_start + end].trim();
        }
    }

    if let Some(start) = trimmed.find('{') {
        if let Some(end) = trimmed.rfind('}') {
            return &trimmed[start..=end];
        }
    }

    trimmed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_json_raw() {
        assert_eq!(extract_json(r#"{"is_pain": true}"#), r#"{"is_pain": true}"#);
    }

    #[test]
    fn extract_json_code_block() {
        let input = "Here you go:\n```json\n{\"is_pain\": true}\n```\nDone.";
        assert_eq!(extract_json(input), r#"{"is_pain": true}"#);
    }

    #[test]
    fn extract_json_with_prefix() {
        let input = "Sure! Here's the answer: {\"is_pain\": false}";
        assert_eq!(extract_json(input), r#"{"is_pain": false}"#);
    }
}
