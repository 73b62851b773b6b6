//! LLM half of C7: submits surviving canonical topics and asks for merge
//! pairs beyond what rule-based similarity already caught. Cycle detection
//! (open question c) lives in the pipeline crate, which owns applying the
//! plan against the store.

use serde::Deserialize;

use crate::json::extract_json;
use crate::provider::{LlmError, LlmProvider, Message, Role};

#[derive(Debug, Deserialize)]
pub struct TopicMergePlan {
    pub merges: Vec<MergePair>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MergePair {
    pub from: String,
    pub to: String,
}

#[derive(Debug, thiserror::Error)]
pub enum TopicMergeError {
    #[error(transparent)]
    Llm(#[from] LlmError),
    #[error("failed to parse topic-merge response: {0} (raw: {1})")]
    Parse(String, String),
}

const SYSTEM_PROMPT: &str = "You consolidate near-duplicate product-research topic labels. \
Given a list of canonical topics, return pairs that refer to the same underlying problem and should be merged. \
Respond ONLY with JSON: {\"merges\": [{\"from\": string, \"to\": string}, ...]}. Only include pairs you are confident about; an empty list is fine.";

/// Submits up to 50 topics (callers truncate before invoking).
pub async fn propose_merges(provider: &dyn LlmProvider, topics: &[String]) -> Result<TopicMergePlan, TopicMergeError> {
    let user_prompt = format!("Topics:\n{}", topics.iter().map(|t| format!("- {t}")).collect::<Vec<_>>().join("\n"));

    let messages = vec![
        Message { role: Role::System, content: SYSTEM_PROMPT.to_string() },
        Message { role: Role::User, content: user_prompt },
    ];

    let response = provider.complete(messages, 0.0, 800).await?;
    let json_str = extract_json(&response);

    serde_json::from_str::<TopicMergePlan>(json_str).map_err(|e| TopicMergeError::Parse(e.to_string(), response))
}
