//! C13: MVP feature suggestions for a cluster, from its member quotes.
//! Offset against the market estimator on alternating cron ticks (§4.13).

use serde::Deserialize;

use crate::json::extract_json;
use crate::provider::{LlmError, LlmProvider, Message, Role};

#[derive(Debug, Deserialize)]
pub struct SuggestedFeature {
    pub feature_name: String,
    pub description: String,
    pub priority: String,
    pub effort_estimate: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct FeatureSuggestions {
    pub features: Vec<SuggestedFeature>,
}

#[derive(Debug, thiserror::Error)]
pub enum FeatureExtractionError {
    #[error(transparent)]
    Llm(#[from] LlmError),
    #[error("failed to parse feature extraction response: {0} (raw: {1})")]
    Parse(String, String),
}

const SYSTEM_PROMPT: &str = "You propose a minimal feature set for a product idea derived from community pain points. \
Respond ONLY with JSON: {\"features\": [{\"feature_name\": string, \"description\": string, \
\"priority\": \"must|should|could\", \"effort_estimate\": \"small|medium|large\" or null}]}. Propose 3 to 6 features.";

pub async fn extract(provider: &dyn LlmProvider, topic: &str, quotes: &[String]) -> Result<FeatureSuggestions, FeatureExtractionError> {
    let mut prompt = format!("Topic: {topic}\n\nRepresentative quotes:\n");
    for q in quotes.iter().take(15) {
        prompt.push_str(&format!("- \"{q}\"\n"));
    }

    let messages = vec![
        Message { role: Role::System, content: SYSTEM_PROMPT.to_string() },
        Message { role: Role::User, content: prompt },
    ];

    let response = provider.complete(messages, 0.4, 700).await?;
    let json_str = extract_json(&response);

    serde_json::from_str::<FeatureSuggestions>(json_str).map_err(|e| FeatureExtractionError::Parse(e.to_string(), response))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_features() {
        let raw = r#"{"features": [{"feature_name": "Auto-reminders", "description": "Send reminders for overdue invoices", "priority": "must", "effort_estimate": "small"}]}"#;
        let parsed: FeatureSuggestions = serde_json::from_str(extract_json(raw)).unwrap();
        assert_eq!(parsed.features.len(), 1);
        assert_eq!(parsed.features[0].priority, "must");
    }
}
