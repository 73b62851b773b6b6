//! C1 Source Fetcher — Hacker News half, via the Algolia HN Search API.
//! HN items are folded into the same "comment" shape the Reddit side
//! produces, using synthesized ids and `subreddit = "hackernews"` (§3).

use painmine_core::ratelimit::IntervalLimiter;
use reqwest::Client;
use serde::Deserialize;

use crate::error::FetchError;
use crate::reddit::RedditComment;

#[derive(Debug, Deserialize)]
struct AlgoliaResponse {
    hits: Vec<AlgoliaHit>,
}

#[derive(Debug, Deserialize)]
struct AlgoliaHit {
    #[serde(rename = "objectID")]
    object_id: String,
    #[serde(default)]
    comment_text: Option<String>,
    #[serde(default)]
    story_title: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    points: Option<i64>,
    #[serde(default)]
    created_at_i: i64,
}

pub struct HnClient {
    client: Client,
    limiter: IntervalLimiter,
    base_url: String,
}

impl HnClient {
    pub fn new(rate_ms: u64) -> Self {
        Self {
            client: Client::new(),
            limiter: IntervalLimiter::new(rate_ms),
            base_url: "https://hn.algolia.com/api/v1".to_string(),
        }
    }

    /// `SearchHN(query, limit) -> [HNComment]`. Failures are non-fatal.
    pub async fn search(&mut self, query: &str, limit: u32) -> Vec<RedditComment> {
        match self.search_inner(query, limit).await {
            Ok(comments) => comments,
            Err(e) => {
                tracing::warn!(query, error = %e, "hn search failed");
                Vec::new()
            }
        }
    }

    async fn search_inner(&mut self, query: &str, limit: u32) -> Result<Vec<RedditComment>, FetchError> {
        self.limiter.wait().await;

        let response = self
            .client
            .get(format!("{}/search", self.base_url))
            .query(&[
                ("query", query.to_string()),
                ("tags", "comment".to_string()),
                ("hitsPerPage", limit.to_string()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(FetchError::Status(response.status()));
        }

        let parsed: AlgoliaResponse = response.json().await.map_err(|e| FetchError::Parse(e.to_string()))?;

        let comments = parsed
            .hits
            .into_iter()
            .filter_map(|hit| {
                let body = hit.comment_text.unwrap_or_default();
                if body == "[deleted]" || body == "[removed]" || body.trim().len() < 30 {
                    return None;
                }
                let title = hit.story_title.or(hit.title).unwrap_or_default();
                Some(RedditComment {
                    id: format!("hn_{}", hit.object_id),
                    post_id: format!("hn_{}", hit.object_id),
                    parent_id: None,
                    body,
                    author: hit.author.unwrap_or_default(),
                    created_utc: hit.created_at_i,
                    score: hit.points.unwrap_or(0),
                    post_score: hit.points.unwrap_or(0),
                    post_title: title,
                    subreddit: "hackernews".to_string(),
                })
            })
            .collect();

        Ok(comments)
    }
}
