//! C7 Topic Merger — rule-based grouping every tick, an LLM pass gated on
//! `cron_count % 6 == 0`, and a centroid-embedding merge for singleton
//! clusters.

use std::collections::{HashMap, HashSet};

use painmine_embed::cosine_similarity;
use painmine_llm::topic_merge::propose_merges;
use painmine_llm::LlmProvider;
use painmine_store::cluster::ClusterStore;
use painmine_store::embedding::EmbeddingStore;
use painmine_store::pain::PainStore;
use painmine_store::trend::TrendStore;
use sqlx::PgPool;

use crate::normalize::{normalize, topics_match};

const LLM_MERGE_BATCH: usize = 50;
const CENTROID_MERGE_THRESHOLD: f32 = 0.85;

pub struct MergeRun {
    pub rule_based_merges: u32,
    pub llm_merges: u32,
    pub centroid_merges: u32,
}

/// One merger pass (§4.7). `cron_count` gates the LLM sub-phase.
pub async fn run(
    pool: &PgPool,
    provider: Option<&dyn LlmProvider>,
    embedding_dims: usize,
    cron_count: i64,
    cron_modulo_merge: i64,
) -> Result<MergeRun, sqlx::Error> {
    let mut run = MergeRun { rule_based_merges: 0, llm_merges: 0, centroid_merges: 0 };

    let topics = TrendStore::all_topics(pool).await?;
    let rule_plan = rule_based_groups(&topics);
    for (from, to) in &rule_plan {
        apply_merge(pool, from, to).await?;
        run.rule_based_merges += 1;
    }

    if cron_modulo_merge > 0 && cron_count % cron_modulo_merge == 0 {
        if let Some(provider) = provider {
            let surviving = TrendStore::all_topics(pool).await?;
            let sample: Vec<String> = surviving.into_iter().take(LLM_MERGE_BATCH).collect();
            if !sample.is_empty() {
                match propose_merges(provider, &sample).await {
                    Ok(plan) => {
                        for pair in drop_cycles(plan.merges) {
                            if pair.from != pair.to {
                                apply_merge(pool, &pair.from, &pair.to).await?;
                                run.llm_merges += 1;
                            }
                        }
                    }
                    Err(e) => tracing::warn!(error = %e, "topic merge LLM pass failed"),
                }
            }
        }
    }

    run.centroid_merges = centroid_merge(pool, embedding_dims).await?;

    Ok(run)
}

/// Group topics by rule-based equivalence (§4.7 Similarity) and emit
/// `(from, to)` pairs merging every non-canonical member into the first
/// (alphabetically smallest normalized form) member of its group.
fn rule_based_groups(topics: &[String]) -> Vec<(String, String)> {
    let mut merges = Vec::new();
    let mut assigned: HashSet<String> = HashSet::new();
    let mut canon: Vec<String> = topics.to_vec();
    canon.sort();

    for i in 0..canon.len() {
        let a = &canon[i];
        if assigned.contains(a) {
            continue;
        }
        for b in canon.iter().skip(i + 1) {
            if assigned.contains(b) || b == a {
                continue;
            }
            if topics_match(a, b) {
                let canonical = normalize(a);
                if *b != canonical {
                    merges.push((b.clone(), canonical.clone()));
                }
                assigned.insert(b.clone());
            }
        }
    }

    merges
}

/// Drop `(a->b, b->a)` cycle pairs per open question (c).
fn drop_cycles(pairs: Vec<painmine_llm::topic_merge::MergePair>) -> Vec<painmine_llm::topic_merge::MergePair> {
    let reverse: HashSet<(String, String)> = pairs.iter().map(|p| (p.to.clone(), p.from.clone())).collect();
    pairs.into_iter().filter(|p| !reverse.contains(&(p.from.clone(), p.to.clone())) || p.from < p.to).collect()
}

async fn apply_merge(pool: &PgPool, from: &str, to: &str) -> Result<(), sqlx::Error> {
    if from == to {
        return Ok(());
    }

    PainStore::retarget_normalized_topic(pool, from, to).await?;

    let from_clusters = ClusterStore::by_topic(pool, from).await?;
    let to_clusters = ClusterStore::by_topic(pool, to).await?;

    if let (Some(target), true) = (to_clusters.first(), !from_clusters.is_empty()) {
        for source in &from_clusters {
            if source.id == target.id {
                continue;
            }
            ClusterStore::reparent_members(pool, source.id, target.id).await?;
            PainStore::reparent_cluster(pool, source.id, target.id).await?;
            ClusterStore::delete(pool, source.id).await?;
        }
        ClusterStore::recompute_rollups(pool, target.id).await?;
    }

    Ok(())
}

/// Merge any singleton cluster into a ≥2-member cluster whose centroid
/// embedding is more than 0.85 cosine-similar.
async fn centroid_merge(pool: &PgPool, embedding_dims: usize) -> Result<u32, sqlx::Error> {
    let clusters = ClusterStore::all(pool).await?;
    let mut vectors: HashMap<i64, Vec<f32>> = HashMap::new();
    for c in &clusters {
        if let Some(v) = EmbeddingStore::vector(pool, c.centroid_embedding_id, embedding_dims).await? {
            vectors.insert(c.id, v);
        }
    }

    let singletons: Vec<_> = clusters.iter().filter(|c| c.member_count == 1).collect();
    let large: Vec<_> = clusters.iter().filter(|c| c.member_count >= 2).collect();

    let mut merged = 0;
    for small in singletons {
        let Some(small_vec) = vectors.get(&small.id) else { continue };
        let mut best: Option<(f32, i64)> = None;
        for big in &large {
            if big.id == small.id {
                continue;
            }
            let Some(big_vec) = vectors.get(&big.id) else { continue };
            let score = cosine_similarity(small_vec, big_vec);
            if best.map(|(s, _)| score > s).unwrap_or(true) {
                best = Some((score, big.id));
            }
        }
        if let Some((score, target_id)) = best {
            if score > CENTROID_MERGE_THRESHOLD {
                ClusterStore::reparent_members(pool, small.id, target_id).await?;
                PainStore::reparent_cluster(pool, small.id, target_id).await?;
                ClusterStore::delete(pool, small.id).await?;
                ClusterStore::recompute_rollups(pool, target_id).await?;
                merged += 1;
            }
        }
    }

    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rule_based_groups_merges_equivalent_topics() {
        let topics = vec!["client onboarding".to_string(), "customer onboarding".to_string()];
        let merges = rule_based_groups(&topics);
        assert_eq!(merges.len(), 1);
    }

    #[test]
    fn drop_cycles_removes_mutual_pairs() {
        let pairs = vec![
            painmine_llm::topic_merge::MergePair { from: "a".into(), to: "b".into() },
            painmine_llm::topic_merge::MergePair { from: "b".into(), to: "a".into() },
        ];
        let kept = drop_cycles(pairs);
        assert!(kept.len() <= 1);
    }
}
