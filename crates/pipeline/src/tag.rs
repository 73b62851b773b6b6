//! C4 Quality Tagger — per-record LLM call producing topics/persona/severity
//! and the normalized topic (§4.4). Parse failures skip the record rather
//! than defaulting, unlike the binary filter (§7 kind b).

use painmine_llm::tagger::{tag, TaggingError};
use painmine_llm::LlmProvider;
use painmine_store::pain::{PainStore, Severity};
use sqlx::PgPool;

use crate::normalize::normalize;

pub struct TagRun {
    pub tagged: u32,
    pub failed: u32,
}

pub async fn run(pool: &PgPool, provider: &dyn LlmProvider, batch_size: i64) -> Result<TagRun, sqlx::Error> {
    let mut run = TagRun { tagged: 0, failed: 0 };

    let records = PainStore::select_untagged(pool, batch_size).await?;
    for record in records {
        match tag(provider, &record.raw_quote).await {
            Ok(result) => {
                let Some(severity) = Severity::from_str(&result.severity) else {
                    tracing::warn!(record_id = record.id, severity = %result.severity, "unrecognized severity, skipping");
                    run.failed += 1;
                    continue;
                };
                if result.topics.is_empty() {
                    tracing::warn!(record_id = record.id, "tagging returned no topics, skipping");
                    run.failed += 1;
                    continue;
                }
                let normalized_topic = normalize(&result.topics[0]);
                PainStore::apply_tagging(pool, record.id, &result.topics, &result.persona, severity, &normalized_topic).await?;
                run.tagged += 1;
            }
            Err(TaggingError::Parse(msg, raw)) => {
                tracing::warn!(record_id = record.id, error = %msg, raw, "tagging parse failed, skipping record");
                run.failed += 1;
            }
            Err(TaggingError::Llm(e)) => {
                tracing::warn!(record_id = record.id, error = %e, "tagging llm call failed");
                run.failed += 1;
            }
        }
    }

    Ok(run)
}
