//! C8 Synthesizer — growth-triggered product concept generation (§4.8).

use painmine_llm::synthesizer::{synthesize, MemberQuote, SynthesisError, SynthesisInput};
use painmine_llm::LlmProvider;
use painmine_store::cluster::{ClusterStore, PainCluster};
use sqlx::PgPool;
use std::collections::HashMap;

const MEMBER_FLOOR: i32 = 5;
const GROWTH_THRESHOLD: f64 = 0.10;

/// True when `cluster` should be (re)synthesized: `member_count >= floor`
/// and either never synthesized, or grown by at least `growth` since the
/// last synthesis.
fn should_synthesize(cluster: &PainCluster) -> bool {
    if cluster.member_count < MEMBER_FLOOR {
        return false;
    }
    if cluster.synthesized_at.is_none() {
        return true;
    }
    let growth = (cluster.member_count - cluster.last_synth_count) as f64 / cluster.last_synth_count.max(1) as f64;
    growth >= GROWTH_THRESHOLD
}

pub struct SynthRun {
    pub synthesized: u32,
}

/// Run one synthesis pass, capped at `batch_size` qualifying clusters per
/// tick so a large backlog of eligible clusters can't blow the per-tick LLM
/// budget (§4.13 "Per-cluster enrichments ... gated ... to cap LLM spend").
pub async fn run(pool: &PgPool, provider: &dyn LlmProvider, batch_size: u32) -> Result<SynthRun, sqlx::Error> {
    let mut run = SynthRun { synthesized: 0 };

    let candidates: Vec<_> = ClusterStore::all(pool)
        .await?
        .into_iter()
        .filter(should_synthesize)
        .take(batch_size as usize)
        .collect();

    for cluster in candidates {
        let members = ClusterStore::members_for_rollup(pool, cluster.id).await?;
        let quotes: Vec<MemberQuote> = members
            .iter()
            .map(|m| MemberQuote { quote: m.raw_quote.clone(), persona: m.persona.clone(), severity: m.severity.clone() })
            .collect();

        let distinct_subreddits: Vec<String> = {
            let mut s: Vec<String> = members.iter().map(|m| m.subreddit.clone()).collect();
            s.sort();
            s.dedup();
            s
        };

        let distinct_personas: Vec<String> = {
            let mut p: Vec<String> = members.iter().filter_map(|m| m.persona.clone()).collect();
            p.sort();
            p.dedup();
            p
        };

        let mut severity_counts: HashMap<String, u32> = HashMap::new();
        for m in &members {
            if let Some(sev) = &m.severity {
                *severity_counts.entry(sev.clone()).or_insert(0) += 1;
            }
        }
        let severity_histogram: Vec<(String, u32)> = severity_counts.into_iter().collect();

        let previous = match (&cluster.product_name, &cluster.tagline) {
            (Some(name), Some(tagline)) if cluster.version > 0 => Some((name.as_str(), tagline.as_str())),
            _ => None,
        };

        let input = SynthesisInput {
            topic: &cluster.topic_canonical,
            quotes: &quotes,
            distinct_personas: &distinct_personas,
            severity_histogram: &severity_histogram,
            distinct_subreddits: &distinct_subreddits,
            previous_name_tagline: previous,
        };

        match synthesize(provider, &input).await {
            Ok(concept) => {
                let applied = ClusterStore::apply_synthesis(
                    pool,
                    cluster.id,
                    cluster.last_synth_count,
                    &concept.product_name,
                    &concept.tagline,
                    &concept.how_it_works,
                    &concept.target_customer,
                    cluster.member_count,
                )
                .await?;
                if applied {
                    run.synthesized += 1;
                } else {
                    tracing::debug!(cluster_id = cluster.id, "synthesis lost the compare-and-write race, skipping");
                }
            }
            Err(SynthesisError::Parse(msg, raw)) => {
                tracing::warn!(cluster_id = cluster.id, error = %msg, raw, "synthesis parse failed, skipping cluster");
            }
            Err(SynthesisError::Llm(e)) => {
                tracing::warn!(cluster_id = cluster.id, error = %e, "synthesis llm call failed");
            }
        }
    }

    Ok(run)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn fixture(member_count: i32, last_synth_count: i32, synthesized: bool) -> PainCluster {
        PainCluster {
            id: 1,
            centroid_text: String::new(),
            topic_canonical: "t".into(),
            broad_category: "other".into(),
            centroid_embedding_id: 1,
            product_name: None,
            tagline: None,
            how_it_works: None,
            target_customer: None,
            social_proof_count: member_count,
            last_synth_count,
            version: if synthesized { 1 } else { 0 },
            member_count,
            unique_authors: member_count,
            subreddit_count: 1,
            total_upvotes: 0,
            total_score: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            synthesized_at: if synthesized { Some(Utc::now()) } else { None },
            scored_at: None,
            top_quotes: None,
            subreddits_list: None,
            categories: None,
        }
    }

    #[test]
    fn below_floor_never_synthesizes() {
        assert!(!should_synthesize(&fixture(4, 0, false)));
    }

    #[test]
    fn never_synthesized_at_floor_synthesizes() {
        assert!(should_synthesize(&fixture(5, 0, false)));
    }

    #[test]
    fn insufficient_growth_skips() {
        assert!(!should_synthesize(&fixture(10, 10, true)));
    }

    #[test]
    fn sufficient_growth_triggers() {
        assert!(should_synthesize(&fixture(11, 10, true)));
    }

    #[test]
    fn single_cluster_lifecycle_growth_sequence() {
        // 6-member cluster never synthesized: first synthesis fires.
        let first = fixture(6, 0, false);
        assert!(should_synthesize(&first));

        // Same 6 members, now synthesized (last_synth_count=6): no new
        // members means no growth, so no re-synthesis.
        let steady = fixture(6, 6, true);
        assert!(!should_synthesize(&steady));

        // One more member arrives: growth = 1/6 ≈ 0.166 >= 0.10 threshold.
        let grown = fixture(7, 6, true);
        assert!(should_synthesize(&grown));
    }
}
