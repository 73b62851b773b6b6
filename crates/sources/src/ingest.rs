//! Glue between the fetchers and C2's `RawStore`: upserts fetched records
//! and maintains the per-post "comments fetched" watermark (§4.2).

use painmine_store::raw::{NewRawComment, NewRawPost, RawStore};
use sqlx::PgPool;

use crate::hn::HnClient;
use crate::reddit::{comment_limit_for, RedditClient, RedditComment, RedditPost, Sort};

/// Fetch a subreddit listing and upsert every post. Returns the posts that
/// were newly inserted (candidates for a comment-fetch pass).
pub async fn ingest_listing(
    pool: &PgPool,
    reddit: &mut RedditClient,
    subreddit: &str,
    sort: Sort,
    time_window: &str,
) -> Result<Vec<RedditPost>, sqlx::Error> {
    let posts = reddit.fetch_subreddit_listing(subreddit, sort, time_window).await;
    let mut inserted = Vec::new();

    for post in posts {
        let result = RawStore::upsert_post(
            pool,
            &NewRawPost {
                id: post.id.clone(),
                subreddit: post.subreddit.clone(),
                title: post.title.clone(),
                body: post.body.clone(),
                author: post.author.clone(),
                created_utc: post.created_utc,
                score: post.score,
                num_comments: post.num_comments,
                url: post.url.clone(),
                permalink: post.permalink.clone(),
                sort_type: post.sort_type.clone(),
            },
        )
        .await?;

        if result.inserted {
            inserted.push(post);
        }
    }

    Ok(inserted)
}

/// Fetch and upsert comments for one post, skipping it if already fetched
/// (watermark `comments_fetched > 0`).
pub async fn ingest_comments(pool: &PgPool, reddit: &mut RedditClient, post: &RedditPost, depth_max: u32) -> Result<usize, sqlx::Error> {
    if RawStore::comments_fetched(pool, &post.id).await? > 0 {
        return Ok(0);
    }

    let limit = comment_limit_for(post.score, post.num_comments);
    let comments = reddit.fetch_post_comments(&post.id, &post.subreddit, limit, depth_max).await;
    let n = comments.len();

    for comment in &comments {
        upsert_comment(pool, comment).await?;
    }

    RawStore::set_comments_fetched(pool, &post.id, n as i32).await?;
    Ok(n)
}

/// Run an HN Algolia search for `query` and upsert every hit as a comment.
pub async fn ingest_hn_search(pool: &PgPool, hn: &mut HnClient, query: &str, limit: u32) -> Result<usize, sqlx::Error> {
    let comments = hn.search(query, limit).await;
    let n = comments.len();
    for comment in &comments {
        upsert_comment(pool, comment).await?;
    }
    Ok(n)
}

async fn upsert_comment(pool: &PgPool, c: &RedditComment) -> Result<(), sqlx::Error> {
    RawStore::upsert_comment(
        pool,
        &NewRawComment {
            id: c.id.clone(),
            post_id: c.post_id.clone(),
            parent_id: c.parent_id.clone(),
            body: c.body.clone(),
            author: c.author.clone(),
            created_utc: c.created_utc,
            score: c.score,
            post_score: c.post_score,
            post_title: c.post_title.clone(),
            subreddit: c.subreddit.clone(),
        },
    )
    .await?;
    Ok(())
}
