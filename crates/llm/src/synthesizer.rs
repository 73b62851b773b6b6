//! C8: product concept synthesis from up to 25 member quotes.

use serde::Deserialize;

use crate::json::extract_json;
use crate::provider::{LlmError, LlmProvider, Message, Role};

#[derive(Debug, Deserialize)]
pub struct ProductConcept {
    pub product_name: String,
    pub tagline: String,
    pub how_it_works: serde_json::Value,
    pub target_customer: String,
}

#[derive(Debug, thiserror::Error)]
pub enum SynthesisError {
    #[error(transparent)]
    Llm(#[from] LlmError),
    #[error("failed to parse synthesis response: {0} (raw: {1})")]
    Parse(String, String),
}

pub struct SynthesisInput<'a> {
    pub topic: &'a str,
    pub quotes: &'a [MemberQuote],
    pub distinct_personas: &'a [String],
    pub severity_histogram: &'a [(String, u32)],
    pub distinct_subreddits: &'a [String],
    pub previous_name_tagline: Option<(&'a str, &'a str)>,
}

pub struct MemberQuote {
    pub quote: String,
    pub persona: Option<String>,
    pub severity: Option<String>,
}

const SYSTEM_PROMPT: &str = "You synthesize product concepts from clusters of personal pain-point quotes. \
Respond ONLY with JSON: {\"product_name\": string, \"tagline\": string, \"how_it_works\": [array of 2-4 short capability strings], \"target_customer\": string}.";

pub async fn synthesize(provider: &dyn LlmProvider, input: &SynthesisInput<'_>) -> Result<ProductConcept, SynthesisError> {
    let mut user_prompt = format!("Topic: {}\n\n", input.topic);
    user_prompt.push_str("Member quotes:\n");
    for q in input.quotes.iter().take(25) {
        user_prompt.push_str(&format!(
            "- \"{}\" (persona: {}, severity: {})\n",
            q.quote,
            q.persona.as_deref().unwrap_or("unknown"),
            q.severity.as_deref().unwrap_or("unknown")
        ));
    }
    user_prompt.push_str(&format!("\nDistinct personas: {}\n", input.distinct_personas.join(", ")));
    user_prompt.push_str("Severity histogram: ");
    for (sev, count) in input.severity_histogram {
        user_prompt.push_str(&format!("{}={} ", sev, count));
    }
    user_prompt.push_str(&format!("\nDistinct subreddits: {}\n", input.distinct_subreddits.join(", ")));
    if let Some((name, tagline)) = input.previous_name_tagline {
        user_prompt.push_str(&format!("\nThis cluster was previously synthesized as \"{}\" — \"{}\". Revise if warranted.\n", name, tagline));
    }

    let messages = vec![
        Message { role: Role::System, content: SYSTEM_PROMPT.to_string() },
        Message { role: Role::User, content: user_prompt },
    ];

    let response = provider.complete(messages, 0.4, 600).await?;
    let json_str = extract_json(&response);

    serde_json::from_str::<ProductConcept>(json_str).map_err(|e| SynthesisError::Parse(e.to_string(), response))
}
