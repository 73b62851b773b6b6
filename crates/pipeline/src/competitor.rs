//! C12 Competitor Miner — rotating vertical-based search for complaints
//! about named competitor products (§4.12).

use once_cell::sync::Lazy;
use painmine_sources::hn::HnClient;
use painmine_sources::reddit::RedditClient;
use painmine_store::competitor::{CompetitorStore, NewCompetitorMention, Sentiment};
use painmine_store::processing_state::ProcessingStateStore;
use regex::Regex;
use sqlx::PgPool;

const VERTICALS_PER_RUN: usize = 3;
const SEARCH_LIMIT: u32 = 25;

struct Vertical {
    name: &'static str,
    products: &'static [&'static str],
    subreddits: &'static [&'static str],
}

static VERTICALS: &[Vertical] = &[
    Vertical {
        name: "invoicing",
        products: &["Xero", "QuickBooks", "FreshBooks"],
        subreddits: &["smallbusiness", "AusProperty", "sweatystartup"],
    },
    Vertical {
        name: "scheduling",
        products: &["Calendly", "Acuity", "Square Appointments"],
        subreddits: &["smallbusiness", "Entrepreneur"],
    },
    Vertical {
        name: "crm",
        products: &["HubSpot", "Salesforce", "Pipedrive"],
        subreddits: &["sales", "smallbusiness", "Entrepreneur"],
    },
    Vertical {
        name: "payroll",
        products: &["Gusto", "ADP", "Employment Hero"],
        subreddits: &["smallbusiness", "humanresources"],
    },
    Vertical {
        name: "ecommerce",
        products: &["Shopify", "WooCommerce", "BigCommerce"],
        subreddits: &["shopify", "ecommerce", "smallbusiness"],
    },
    Vertical {
        name: "project_management",
        products: &["Asana", "Monday.com", "ClickUp"],
        subreddits: &["projectmanagement", "productivity"],
    },
];

const NEGATIVE_WORDS: &[&str] = &["hate", "terrible", "awful", "broken", "garbage", "useless", "sucks", "nightmare", "worst"];
const FRUSTRATED_WORDS: &[&str] = &["frustrated", "frustrating", "annoying", "confusing", "disappointed", "struggling", "tired of", "sick of"];

static GAP_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)i wish (it|[a-z]+) (could|would|had)\s+([^.!?\n]{5,80})",
        r"(?i)missing (a |the )?([^.!?\n]{3,60})",
        r"(?i)no way to\s+([^.!?\n]{3,80})",
        r"(?i)doesn'?t (support|let you|allow)\s+([^.!?\n]{3,80})",
        r"(?i)there'?s no\s+([^.!?\n]{3,60})",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid feature-gap pattern"))
    .collect()
});

fn classify_sentiment(text: &str) -> Sentiment {
    let lower = text.to_lowercase();
    let negative = NEGATIVE_WORDS.iter().filter(|w| lower.contains(*w)).count();
    let frustrated = FRUSTRATED_WORDS.iter().filter(|w| lower.contains(*w)).count();
    if negative > 0 && negative >= frustrated {
        Sentiment::Negative
    } else if frustrated > 0 {
        Sentiment::Frustrated
    } else {
        Sentiment::Neutral
    }
}

fn extract_feature_gap(text: &str) -> Option<String> {
    for re in GAP_PATTERNS.iter() {
        if let Some(m) = re.find(text) {
            let phrase = m.as_str().trim();
            let truncated: String = phrase.chars().take(160).collect();
            return Some(truncated);
        }
    }
    None
}

pub struct CompetitorRun {
    pub mentions_found: u32,
}

/// One competitor-mining pass (§4.12). Picks the next `VERTICALS_PER_RUN`
/// verticals via the persisted rotating index and searches each product's
/// whitelisted subreddits plus an HN-wide search.
pub async fn run(
    pool: &PgPool,
    reddit: &mut RedditClient,
    hn: &mut HnClient,
) -> Result<CompetitorRun, sqlx::Error> {
    let mut run = CompetitorRun { mentions_found: 0 };

    let start = ProcessingStateStore::next_vertical_index(pool, VERTICALS.len() as i64).await?;
    let mut indices: Vec<usize> = Vec::with_capacity(VERTICALS_PER_RUN);
    for i in 0..VERTICALS_PER_RUN.min(VERTICALS.len()) {
        indices.push(((start as usize) + i) % VERTICALS.len());
    }

    for &vi in &indices {
        let vertical = &VERTICALS[vi];
        for product in vertical.products {
            let mut seen_urls = std::collections::HashSet::new();
            let query = format!("{product} (sucks OR terrible OR alternative OR switching OR \"wish it\")");

            for subreddit in vertical.subreddits {
                let posts = reddit.search_subreddit(subreddit, &query, SEARCH_LIMIT).await;
                for post in posts {
                    let Some(url) = post.permalink.clone().or_else(|| post.url.clone()) else { continue };
                    if !seen_urls.insert(url.clone()) {
                        continue;
                    }
                    let text = format!("{} {}", post.title, post.body);
                    let mention = NewCompetitorMention {
                        vertical: vertical.name.to_string(),
                        product: product.to_string(),
                        url,
                        title: post.title.clone(),
                        snippet: text.chars().take(300).collect(),
                        sentiment: classify_sentiment(&text),
                        feature_gap: extract_feature_gap(&text),
                        subreddit: subreddit.to_string(),
                    };
                    if CompetitorStore::insert(pool, &mention).await?.is_some() {
                        run.mentions_found += 1;
                    }
                }
            }

            let hn_comments = hn.search(&format!("{product} alternative"), SEARCH_LIMIT).await;
            for comment in hn_comments {
                let url = format!("https://news.ycombinator.com/item?id={}", comment.id.trim_start_matches("hn_"));
                if !seen_urls.insert(url.clone()) {
                    continue;
                }
                let text = format!("{} {}", comment.post_title, comment.body);
                let mention = NewCompetitorMention {
                    vertical: vertical.name.to_string(),
                    product: product.to_string(),
                    url,
                    title: comment.post_title.clone(),
                    snippet: text.chars().take(300).collect(),
                    sentiment: classify_sentiment(&text),
                    feature_gap: extract_feature_gap(&text),
                    subreddit: "hackernews".to_string(),
                };
                if CompetitorStore::insert(pool, &mention).await?.is_some() {
                    run.mentions_found += 1;
                }
            }
        }
    }

    Ok(run)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_words_classify_negative() {
        assert_eq!(classify_sentiment("this tool is garbage and a nightmare to use"), Sentiment::Negative);
    }

    #[test]
    fn frustrated_words_without_negative_classify_frustrated() {
        assert_eq!(classify_sentiment("I'm so frustrated trying to get this to work"), Sentiment::Frustrated);
    }

    #[test]
    fn plain_text_classifies_neutral() {
        assert_eq!(classify_sentiment("just switched plans this month"), Sentiment::Neutral);
    }

    #[test]
    fn extracts_i_wish_gap() {
        let gap = extract_feature_gap("I wish it could export to CSV directly without the extra step");
        assert!(gap.is_some());
        assert!(gap.unwrap().to_lowercase().starts_with("i wish"));
    }

    #[test]
    fn extracts_missing_gap() {
        let gap = extract_feature_gap("missing a dark mode option entirely");
        assert!(gap.is_some());
    }

    #[test]
    fn no_pattern_match_returns_none() {
        assert_eq!(extract_feature_gap("everything works great for us"), None);
    }

    #[test]
    fn vertical_rotation_wraps() {
        // six verticals, picking three starting from index 5 should wrap to [5, 0, 1]
        let start = 5usize;
        let indices: Vec<usize> = (0..VERTICALS_PER_RUN.min(VERTICALS.len())).map(|i| (start + i) % VERTICALS.len()).collect();
        assert_eq!(indices, vec![5, 0, 1]);
    }
}
