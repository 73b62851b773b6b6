//! C3 Binary Pain Filter — classifies unprocessed raw comments and promotes
//! positives into `pain_records` (§4.3).

use painmine_llm::binary_filter;
use painmine_llm::LlmProvider;
use painmine_store::pain::{NewPainRecord, PainStore, SourceType};
use painmine_store::raw::RawStore;
use sqlx::PgPool;

pub struct FilterRun {
    pub processed: u32,
    pub promoted: u32,
    pub defaulted: u32,
}

pub async fn run(pool: &PgPool, provider: &dyn LlmProvider, batch_size: i64) -> Result<FilterRun, sqlx::Error> {
    let mut run = FilterRun { processed: 0, promoted: 0, defaulted: 0 };

    let comments = RawStore::select_unprocessed_comments(pool, batch_size).await?;
    for comment in comments {
        let outcome = match binary_filter::classify(provider, &comment.body).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!(comment_id = %comment.id, error = %e, "binary filter llm call failed, leaving unprocessed");
                continue;
            }
        };

        RawStore::mark_processed(pool, &comment.id, outcome.is_pain).await?;
        run.processed += 1;
        if outcome.defaulted {
            run.defaulted += 1;
        }

        if outcome.is_pain {
            let source_type = if comment.subreddit == "hackernews" { SourceType::HnComment } else { SourceType::Comment };
            let new_record = NewPainRecord {
                source_type,
                source_id: comment.id.clone(),
                subreddit: comment.subreddit.clone(),
                raw_quote: comment.body.clone(),
                author: comment.author.clone(),
                source_score: comment.score,
                source_url: None,
            };
            if PainStore::insert(pool, new_record).await?.is_some() {
                run.promoted += 1;
            }
        }
    }

    Ok(run)
}
