//! C13: market size estimate for a cluster, from its topic and product
//! concept. Offset against the feature extractor on alternating cron ticks
//! to cap LLM spend (§4.13).

use serde::Deserialize;

use crate::json::extract_json;
use crate::provider::{LlmError, LlmProvider, Message, Role};

#[derive(Debug, Deserialize)]
pub struct MarketSizeEstimate {
    pub tam_low: i64,
    pub tam_high: i64,
    pub sam_estimate: i64,
    pub reasoning: String,
    pub confidence: String,
}

#[derive(Debug, thiserror::Error)]
pub enum MarketEstimateError {
    #[error(transparent)]
    Llm(#[from] LlmError),
    #[error("failed to parse market estimate response: {0} (raw: {1})")]
    Parse(String, String),
}

const SYSTEM_PROMPT: &str = "You estimate addressable market size in USD for a product opportunity derived from \
community pain points. Respond ONLY with JSON: {\"tam_low\": integer, \"tam_high\": integer, \"sam_estimate\": integer, \
\"reasoning\": \"1-2 sentence justification\", \"confidence\": \"low|medium|high\"}. tam_low <= tam_high.";

pub struct MarketEstimateInput<'a> {
    pub topic: &'a str,
    pub product_name: Option<&'a str>,
    pub target_customer: Option<&'a str>,
    pub member_count: i32,
    pub subreddit_count: i32,
}

pub async fn estimate(provider: &dyn LlmProvider, input: &MarketEstimateInput<'_>) -> Result<MarketSizeEstimate, MarketEstimateError> {
    let mut prompt = format!("Topic: {}\n", input.topic);
    if let Some(name) = input.product_name {
        prompt.push_str(&format!("Product concept: {name}\n"));
    }
    if let Some(target) = input.target_customer {
        prompt.push_str(&format!("Target customer: {target}\n"));
    }
    prompt.push_str(&format!(
        "Evidence: {} community members across {} distinct subreddits reported this pain.\n",
        input.member_count, input.subreddit_count
    ));

    let messages = vec![
        Message { role: Role::System, content: SYSTEM_PROMPT.to_string() },
        Message { role: Role::User, content: prompt },
    ];

    let response = provider.complete(messages, 0.3, 400).await?;
    let json_str = extract_json(&response);

    let parsed = serde_json::from_str::<MarketSizeEstimate>(json_str).map_err(|e| MarketEstimateError::Parse(e.to_string(), response))?;
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_estimate() {
        let raw = r#"{"tam_low": 1000000, "tam_high": 50000000, "sam_estimate": 5000000, "reasoning": "niche but recurring", "confidence": "medium"}"#;
        let parsed: MarketSizeEstimate = serde_json::from_str(extract_json(raw)).unwrap();
        assert!(parsed.tam_low <= parsed.tam_high);
        assert_eq!(parsed.confidence, "medium");
    }
}
