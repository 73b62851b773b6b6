//! C4: quality tagger. Parse failure skips the record (§7 kind b), counted
//! by the caller rather than defaulted — unlike the binary filter, a bad
//! tagging guess would corrupt `normalized_topic` downstream.

use serde::Deserialize;

use crate::json::extract_json;
use crate::provider::{LlmError, LlmProvider, Message, Role};

#[derive(Debug, Deserialize)]
pub struct TaggingResult {
    pub topics: Vec<String>,
    pub persona: String,
    pub severity: String,
}

#[derive(Debug, thiserror::Error)]
pub enum TaggingError {
    #[error(transparent)]
    Llm(#[from] LlmError),
    #[error("failed to parse tagging response: {0} (raw: {1})")]
    Parse(String, String),
}

const SYSTEM_PROMPT: &str = "You tag personal pain-point quotes for a product research pipeline. \
Respond ONLY with JSON: {\"topics\": [3 to 5 short lowercase topic phrases], \"persona\": \"short role/identity phrase\", \"severity\": \"low|medium|high|critical\"}.";

pub async fn tag(provider: &dyn LlmProvider, raw_quote: &str) -> Result<TaggingResult, TaggingError> {
    let messages = vec![
        Message { role: Role::System, content: SYSTEM_PROMPT.to_string() },
        Message { role: Role::User, content: raw_quote.to_string() },
    ];

    let response = provider.complete(messages, 0.2, 300).await?;
    let json_str = extract_json(&response);

    serde_json::from_str::<TaggingResult>(json_str).map_err(|e| TaggingError::Parse(e.to_string(), response))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_tagging() {
        let raw = r#"{"topics": ["invoicing", "late payments"], "persona": "freelancer", "severity": "high"}"#;
        let parsed: TaggingResult = serde_json::from_str(extract_json(raw)).unwrap();
        assert_eq!(parsed.topics.len(), 2);
        assert_eq!(parsed.severity, "high");
    }
}
