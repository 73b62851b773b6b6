//! C11 Geo Tagger — scores `{AU, US, UK, EU, GLOBAL}` from subreddit
//! whitelists and regex keyword patterns (§4.11).

use once_cell::sync::Lazy;
use painmine_store::geo::GeoStore;
use painmine_store::pain::PainStore;
use regex::Regex;
use sqlx::PgPool;

const MAX_SIGNALS: usize = 5;
const GLOBAL_BASE: f64 = 0.1;

struct RegionRule {
    region: &'static str,
    subreddits: &'static [&'static str],
    patterns: &'static [(&'static str, f64)],
}

static RULES: Lazy<Vec<(RegionRule, Vec<Regex>)>> = Lazy::new(|| {
    let raw: Vec<RegionRule> = vec![
        RegionRule {
            region: "AU",
            subreddits: &["australia", "melbourne", "sydney", "brisbane", "perth", "adelaide", "ausfinance", "AusProperty"],
            patterns: &[
                (r"\baustralia\b", 0.8),
                (r"\bsydney\b", 0.7),
                (r"\bmelbourne\b", 0.7),
                (r"\bausfinance\b", 0.6),
                (r"\bato\b", 0.5),
            ],
        },
        RegionRule {
            region: "US",
            subreddits: &["personalfinance", "smallbusiness", "Entrepreneur", "nyc", "sanfrancisco"],
            patterns: &[
                (r"\bunited states\b", 0.8),
                (r"\birs\b", 0.7),
                (r"\bdollars?\b", 0.5),
                (r"\bnew york\b", 0.6),
                (r"\bboston\b", 0.6),
            ],
        },
        RegionRule {
            region: "UK",
            subreddits: &["AskUK", "UKPersonalFinance", "london"],
            patterns: &[(r"\buk\b", 0.8), (r"\blondon\b", 0.7), (r"\bhmrc\b", 0.7), (r"\bvat\b", 0.6)],
        },
        RegionRule {
            region: "EU",
            subreddits: &["eupersonalfinance", "germany", "france"],
            patterns: &[(r"\beurope\b", 0.7), (r"\bgdpr\b", 0.6), (r"\beuro\b", 0.5)],
        },
    ];

    raw.into_iter()
        .map(|rule| {
            let compiled = rule.patterns.iter().map(|(p, _)| Regex::new(&format!("(?i){p}")).expect("valid geo pattern")).collect();
            (rule, compiled)
        })
        .collect()
});

struct ScoreResult {
    region: String,
    score: f64,
    signals: Vec<String>,
}

fn score_record(raw_quote: &str, subreddit: &str) -> ScoreResult {
    let mut best: Option<ScoreResult> = None;

    for (rule, compiled) in RULES.iter() {
        let mut score = 0.0;
        let mut signals = Vec::new();

        if rule.subreddits.iter().any(|s| s.eq_ignore_ascii_case(subreddit)) {
            score += 0.9;
            signals.push(format!("subreddit:{subreddit}"));
        }

        for (i, re) in compiled.iter().enumerate() {
            if let Some(m) = re.find(raw_quote) {
                score += rule.patterns[i].1;
                signals.push(m.as_str().to_lowercase());
            }
        }

        signals.truncate(MAX_SIGNALS);
        signals.dedup();

        let candidate = ScoreResult { region: rule.region.to_string(), score, signals };
        if best.as_ref().map(|b| candidate.score > b.score).unwrap_or(true) && candidate.score > 0.0 {
            best = Some(candidate);
        }
    }

    best.unwrap_or(ScoreResult { region: "GLOBAL".to_string(), score: GLOBAL_BASE, signals: Vec::new() })
}

pub async fn run(pool: &PgPool, batch_size: i64) -> Result<u32, sqlx::Error> {
    let records = PainStore::select_ungeotagged(pool, batch_size).await?;
    let mut tagged = 0;

    for record in &records {
        let result = score_record(&record.raw_quote, &record.subreddit);
        let confidence = result.score.min(1.0);
        PainStore::apply_geo(pool, record.id, &result.region, confidence, &result.signals).await?;
        tagged += 1;
    }

    if tagged > 0 {
        GeoStore::recompute_all(pool).await?;
    }

    Ok(tagged)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subreddit_whitelist_outranks_keyword() {
        // §8 scenario 6: r/melbourne mentioning "Boston" resolves AU.
        let result = score_record("I really miss living near Boston", "melbourne");
        assert_eq!(result.region, "AU");
    }

    #[test]
    fn no_hits_falls_back_to_global_at_point_one() {
        let result = score_record("something completely unrelated to any region", "cooking");
        assert_eq!(result.region, "GLOBAL");
        assert!((result.score - GLOBAL_BASE).abs() < 1e-9);
    }

    #[test]
    fn keyword_alone_resolves_region() {
        let result = score_record("dealing with HMRC paperwork is a nightmare", "smallbusinessowners");
        assert_eq!(result.region, "UK");
    }
}
