//! C1 Source Fetcher — Reddit half. Grounded in the request/response shapes
//! of a real Reddit JSON-API client from the example pack (listing endpoint,
//! subreddit-scoped comment tree, `selftext`/`over_18`/`permalink` fields),
//! reworked from a human-readable "search tool" into typed records for the
//! pipeline.

use async_trait::async_trait;
use painmine_core::ratelimit::IntervalLimiter;
use reqwest::Client;
use serde::Deserialize;

use crate::error::FetchError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sort {
    Top,
    Hot,
    New,
}

impl Sort {
    fn as_str(self) -> &'static str {
        match self {
            Sort::Top => "top",
            Sort::Hot => "hot",
            Sort::New => "new",
        }
    }
}

#[derive(Debug, Clone)]
pub struct RedditPost {
    pub id: String,
    pub subreddit: String,
    pub title: String,
    pub body: String,
    pub author: String,
    pub created_utc: i64,
    pub score: i64,
    pub num_comments: i64,
    pub url: Option<String>,
    pub permalink: Option<String>,
    pub sort_type: String,
}

#[derive(Debug, Clone)]
pub struct RedditComment {
    pub id: String,
    pub post_id: String,
    pub parent_id: Option<String>,
    pub body: String,
    pub author: String,
    pub created_utc: i64,
    pub score: i64,
    pub post_score: i64,
    pub post_title: String,
    pub subreddit: String,
}

#[derive(Debug, Deserialize)]
struct Listing<T> {
    data: ListingData<T>,
}

#[derive(Debug, Deserialize)]
struct ListingData<T> {
    #[serde(default)]
    children: Vec<Thing<T>>,
}

#[derive(Debug, Deserialize)]
struct Thing<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct PostData {
    id: String,
    title: String,
    author: String,
    subreddit: String,
    score: i64,
    num_comments: i64,
    #[serde(default)]
    selftext: String,
    #[serde(default)]
    url: Option<String>,
    permalink: String,
    created_utc: f64,
    #[serde(default)]
    over_18: bool,
    #[serde(default)]
    removed_by_category: Option<String>,
    #[serde(default)]
    locked: bool,
}

// Reddit represents "no replies" as the empty string `""` rather than an
// empty listing object, so this can't parse directly as `Listing<CommentData>`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RepliesField {
    Listing(Listing<CommentData>),
    Empty(String),
}

impl Default for RepliesField {
    fn default() -> Self {
        RepliesField::Empty(String::new())
    }
}

impl RepliesField {
    fn children(&self) -> &[Thing<CommentData>] {
        match self {
            RepliesField::Listing(l) => &l.data.children,
            RepliesField::Empty(_) => &[],
        }
    }
}

#[derive(Debug, Deserialize, Default)]
struct CommentData {
    #[serde(default)]
    id: String,
    #[serde(default)]
    parent_id: Option<String>,
    #[serde(default)]
    author: String,
    #[serde(default)]
    body: String,
    #[serde(default)]
    score: i64,
    #[serde(default)]
    created_utc: f64,
    #[serde(default)]
    replies: RepliesField,
}

/// Comment-limit schedule per post (§4.1).
pub fn comment_limit_for(score: i64, num_comments: i64) -> u32 {
    if score >= 100 || num_comments >= 100 {
        500
    } else if score >= 50 || num_comments >= 50 {
        300
    } else if score >= 10 || num_comments >= 20 {
        200
    } else {
        100
    }
}

fn is_filtered_body(body: &str) -> bool {
    body == "[deleted]" || body == "[removed]" || body.trim().len() < 30
}

pub struct RedditClient {
    client: Client,
    user_agent: String,
    limiter: IntervalLimiter,
    base_url: String,
}

impl RedditClient {
    pub fn new(user_agent: String, rate_ms: u64) -> Self {
        Self {
            client: Client::new(),
            user_agent,
            limiter: IntervalLimiter::new(rate_ms),
            base_url: "https://www.reddit.com".to_string(),
        }
    }

    /// `FetchSubredditListing(sub, sort, timeWindow) -> [RedditPost]`. Drops
    /// NSFW, removed, and locked posts. Failures are non-fatal: logged and
    /// an empty list is returned.
    pub async fn fetch_subreddit_listing(
        &mut self,
        subreddit: &str,
        sort: Sort,
        time_window: &str,
    ) -> Vec<RedditPost> {
        match self.fetch_subreddit_listing_inner(subreddit, sort, time_window).await {
            Ok(posts) => posts,
            Err(e) => {
                tracing::warn!(subreddit, ?sort, error = %e, "reddit listing fetch failed");
                Vec::new()
            }
        }
    }

    async fn fetch_subreddit_listing_inner(
        &mut self,
        subreddit: &str,
        sort: Sort,
        time_window: &str,
    ) -> Result<Vec<RedditPost>, FetchError> {
        self.limiter.wait().await;

        let url = format!("{}/r/{}/{}.json", self.base_url, subreddit, sort.as_str());
        let response = self
            .client
            .get(&url)
            .header("User-Agent", &self.user_agent)
            .query(&[("limit", "100"), ("t", time_window)])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(FetchError::Status(response.status()));
        }

        let listing: Listing<PostData> = response
            .json()
            .await
            .map_err(|e| FetchError::Parse(e.to_string()))?;

        let posts = listing
            .data
            .children
            .into_iter()
            .map(|t| t.data)
            .filter(|p| !p.over_18 && p.removed_by_category.is_none() && !p.locked)
            .map(|p| RedditPost {
                id: p.id,
                subreddit: p.subreddit,
                title: p.title,
                body: p.selftext,
                author: p.author,
                created_utc: p.created_utc as i64,
                score: p.score,
                num_comments: p.num_comments,
                url: p.url,
                permalink: Some(p.permalink),
                sort_type: sort.as_str().to_string(),
            })
            .collect();

        Ok(posts)
    }

    /// Subreddit-scoped keyword search, used by the competitor miner (§4.12)
    /// to find complaint threads about a named product. Failures are
    /// non-fatal.
    pub async fn search_subreddit(&mut self, subreddit: &str, query: &str, limit: u32) -> Vec<RedditPost> {
        match self.search_subreddit_inner(subreddit, query, limit).await {
            Ok(posts) => posts,
            Err(e) => {
                tracing::warn!(subreddit, query, error = %e, "reddit search failed");
                Vec::new()
            }
        }
    }

    async fn search_subreddit_inner(&mut self, subreddit: &str, query: &str, limit: u32) -> Result<Vec<RedditPost>, FetchError> {
        self.limiter.wait().await;

        let url = format!("{}/r/{}/search.json", self.base_url, subreddit);
        let response = self
            .client
            .get(&url)
            .header("User-Agent", &self.user_agent)
            .query(&[("q", query), ("restrict_sr", "1"), ("limit", &limit.to_string())])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(FetchError::Status(response.status()));
        }

        let listing: Listing<PostData> = response.json().await.map_err(|e| FetchError::Parse(e.to_string()))?;

        let posts = listing
            .data
            .children
            .into_iter()
            .map(|t| t.data)
            .filter(|p| !p.over_18 && p.removed_by_category.is_none() && !p.locked)
            .map(|p| RedditPost {
                id: p.id,
                subreddit: p.subreddit,
                title: p.title,
                body: p.selftext,
                author: p.author,
                created_utc: p.created_utc as i64,
                score: p.score,
                num_comments: p.num_comments,
                url: p.url,
                permalink: Some(p.permalink),
                sort_type: "search".to_string(),
            })
            .collect();

        Ok(posts)
    }

    /// `FetchPostComments(postId, sub, limit, depth) -> [RedditComment]`.
    /// Walks the reply tree up to `depth_max` and returns a flattened list,
    /// dropping deleted/removed/short bodies.
    pub async fn fetch_post_comments(
        &mut self,
        post_id: &str,
        subreddit: &str,
        limit: u32,
        depth_max: u32,
    ) -> Vec<RedditComment> {
        match self.fetch_post_comments_inner(post_id, subreddit, limit, depth_max).await {
            Ok(comments) => comments,
            Err(e) => {
                tracing::warn!(post_id, subreddit, error = %e, "reddit comments fetch failed");
                Vec::new()
            }
        }
    }

    async fn fetch_post_comments_inner(
        &mut self,
        post_id: &str,
        subreddit: &str,
        limit: u32,
        depth_max: u32,
    ) -> Result<Vec<RedditComment>, FetchError> {
        self.limiter.wait().await;

        let url = format!("{}/r/{}/comments/{}.json", self.base_url, subreddit, post_id);
        let response = self
            .client
            .get(&url)
            .header("User-Agent", &self.user_agent)
            .query(&[("limit", limit.to_string())])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(FetchError::Status(response.status()));
        }

        let body_text = response.text().await?;

        // First element is the post listing (for title/score); second is the
        // comment tree. Only the shape of element 1 is needed here, so parse
        // it generically as two top-level listings.
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Page {
            Post(Listing<PostData>),
            Comments(Listing<CommentData>),
        }
        let parsed: Vec<Page> = serde_json::from_str(&body_text).map_err(|e| FetchError::Parse(e.to_string()))?;

        let post_meta = parsed.iter().find_map(|p| match p {
            Page::Post(l) => l.data.children.first().map(|t| (t.data.score, t.data.title.clone())),
            Page::Comments(_) => None,
        });
        let (post_score, post_title) = post_meta.unwrap_or((0, String::new()));

        let mut out = Vec::new();
        for page in &parsed {
            if let Page::Comments(listing) = page {
                walk_comments(&listing.data.children, post_id, subreddit, post_score, &post_title, 1, depth_max, &mut out);
            }
        }
        Ok(out)
    }
}

fn walk_comments(
    children: &[Thing<CommentData>],
    post_id: &str,
    subreddit: &str,
    post_score: i64,
    post_title: &str,
    depth: u32,
    depth_max: u32,
    out: &mut Vec<RedditComment>,
) {
    if depth > depth_max {
        return;
    }
    for thing in children {
        let c = &thing.data;
        if !is_filtered_body(&c.body) {
            out.push(RedditComment {
                id: c.id.clone(),
                post_id: post_id.to_string(),
                parent_id: c.parent_id.clone(),
                body: c.body.clone(),
                author: c.author.clone(),
                created_utc: c.created_utc as i64,
                score: c.score,
                post_score,
                post_title: post_title.to_string(),
                subreddit: subreddit.to_string(),
            });
        }
        walk_comments(c.replies.children(), post_id, subreddit, post_score, post_title, depth + 1, depth_max, out);
    }
}

#[async_trait]
pub trait RedditSource: Send + Sync {
    async fn listing(&mut self, subreddit: &str, sort: Sort, time_window: &str) -> Vec<RedditPost>;
    async fn comments(&mut self, post_id: &str, subreddit: &str, limit: u32, depth_max: u32) -> Vec<RedditComment>;
}

#[async_trait]
impl RedditSource for RedditClient {
    async fn listing(&mut self, subreddit: &str, sort: Sort, time_window: &str) -> Vec<RedditPost> {
        self.fetch_subreddit_listing(subreddit, sort, time_window).await
    }

    async fn comments(&mut self, post_id: &str, subreddit: &str, limit: u32, depth_max: u32) -> Vec<RedditComment> {
        self.fetch_post_comments(post_id, subreddit, limit, depth_max).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comment_limit_schedule() {
        assert_eq!(comment_limit_for(150, 5), 500);
        assert_eq!(comment_limit_for(5, 120), 500);
        assert_eq!(comment_limit_for(60, 10), 300);
        assert_eq!(comment_limit_for(10, 20), 200);
        assert_eq!(comment_limit_for(1, 1), 100);
    }

    #[test]
    fn filters_short_and_removed_bodies() {
        assert!(is_filtered_body("[deleted]"));
        assert!(is_filtered_body("[removed]"));
        assert!(is_filtered_body("too short"));
        assert!(!is_filtered_body("this is a long enough comment body to survive the filter"));
    }

    #[test]
    fn walk_stops_past_depth_max() {
        let leaf = CommentData {
            id: "c3".into(),
            body: "a sufficiently long leaf comment body here".into(),
            author: "leaf".into(),
            ..Default::default()
        };
        let mid = CommentData {
            id: "c2".into(),
            body: "a sufficiently long middle comment body here".into(),
            author: "mid".into(),
            replies: RepliesField::Listing(Listing {
                data: ListingData { children: vec![Thing { data: leaf }] },
            }),
            ..Default::default()
        };
        let root = Thing {
            data: CommentData {
                id: "c1".into(),
                body: "a sufficiently long root comment body here".into(),
                author: "root".into(),
                replies: RepliesField::Listing(Listing {
                    data: ListingData { children: vec![Thing { data: mid }] },
                }),
                ..Default::default()
            },
        };

        let mut out = Vec::new();
        walk_comments(&[root], "p1", "test", 10, "title", 1, 1, &mut out);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, "c1");
    }
}
