//! C3: per-comment binary pain filter. Parse failure defaults to
//! `is_pain = true` — err toward inclusion (§4.3, design note b).

use serde::Deserialize;
use tracing::warn;

use crate::json::extract_json;
use crate::provider::{LlmError, LlmProvider, Message, Role};

#[derive(Debug, Deserialize)]
pub struct BinaryFilterResult {
    pub is_pain: bool,
}

pub struct FilterOutcome {
    pub is_pain: bool,
    /// True when the result came from a parse-failure default rather than a
    /// clean LLM answer — surfaced via `stats.binary_filter_defaulted`.
    pub defaulted: bool,
}

const PROMPT_TEMPLATE: &str = "Is this a PERSONAL problem, frustration, or unmet need?\n\n\"{body}\"\n\nRespond ONLY with JSON: {{\"is_pain\": true|false}}";

pub async fn classify(provider: &dyn LlmProvider, body: &str) -> Result<FilterOutcome, LlmError> {
    let prompt = PROMPT_TEMPLATE.replace("{body}", body);
    let messages = vec![Message { role: Role::User, content: prompt }];

    let response = provider.complete(messages, 0.0, 50).await?;
    let json_str = extract_json(&response);

    match serde_json::from_str::<BinaryFilterResult>(json_str) {
        Ok(result) => Ok(FilterOutcome { is_pain: result.is_pain, defaulted: false }),
        Err(e) => {
            warn!("binary filter parse failure, defaulting to is_pain=true: {} (raw: {})", e, response);
            Ok(FilterOutcome { is_pain: true, defaulted: true })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_clean_json() {
        let parsed: BinaryFilterResult = serde_json::from_str(extract_json(r#"{"is_pain": true}"#)).unwrap();
        assert!(parsed.is_pain);
    }

    #[test]
    fn malformed_json_is_rejected_by_serde() {
        assert!(serde_json::from_str::<BinaryFilterResult>(extract_json("maybe")).is_err());
    }

    struct FixedResponseProvider(&'static str);

    #[async_trait::async_trait]
    impl LlmProvider for FixedResponseProvider {
        async fn complete(&self, _messages: Vec<Message>, _temperature: f32, _max_tokens: u32) -> Result<String, LlmError> {
            Ok(self.0.to_string())
        }
    }

    #[tokio::test]
    async fn malformed_output_defaults_to_is_pain_true() {
        let provider = FixedResponseProvider("maybe");
        let outcome = classify(&provider, "my invoices keep getting paid late").await.unwrap();
        assert!(outcome.is_pain);
        assert!(outcome.defaulted);
    }

    #[tokio::test]
    async fn clean_response_is_not_defaulted() {
        let provider = FixedResponseProvider(r#"{"is_pain": false}"#);
        let outcome = classify(&provider, "I love this product").await.unwrap();
        assert!(!outcome.is_pain);
        assert!(!outcome.defaulted);
    }
}
