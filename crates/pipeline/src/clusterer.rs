//! C6 Clusterer — assigns tagged, embedded, unclustered pain records to
//! the best-matching cluster by cosine similarity against its centroid
//! embedding, or opens a new cluster.

use painmine_embed::cosine_similarity;
use painmine_store::alert::{AlertStore, AlertType, NewAlert};
use painmine_store::cluster::{ClusterStore, NewCluster};
use painmine_store::embedding::EmbeddingStore;
use painmine_store::pain::PainStore;
use sqlx::PgPool;

use crate::category::category_of;

const CLUSTER_THRESHOLD: f64 = 0.65;
const CENTROID_TEXT_LEN: usize = 200;

pub struct ClusterRun {
    pub assigned: u32,
    pub created: u32,
}

/// Run one clustering pass over every unclustered record (§4.6).
pub async fn run(pool: &PgPool, embedding_dims: usize, batch_size: i64) -> Result<ClusterRun, sqlx::Error> {
    let mut run = ClusterRun { assigned: 0, created: 0 };
    let records = PainStore::select_unclustered(pool, batch_size).await?;

    // Centroid set is re-read once per record so newly-opened clusters in
    // this same pass are immediately visible as merge targets.
    for record in records {
        let Some(embedding_id) = record.embedding_id else { continue };
        let Some(vector) = EmbeddingStore::vector(pool, embedding_id, embedding_dims).await? else { continue };
        let Some(normalized_topic) = record.normalized_topic.clone() else { continue };

        let clusters = ClusterStore::all(pool).await?;
        let mut candidates: Vec<(f64, i64, i32)> = Vec::with_capacity(clusters.len());

        for cluster in &clusters {
            let Some(centroid) = EmbeddingStore::vector(pool, cluster.centroid_embedding_id, embedding_dims).await? else { continue };
            let score = cosine_similarity(&vector, &centroid) as f64;
            candidates.push((score, cluster.id, cluster.social_proof_count));
        }

        let matched = best_match(&candidates, CLUSTER_THRESHOLD);
        let cluster_id = if let Some((score, cluster_id, _)) = matched {
            PainStore::assign_cluster(pool, record.id, cluster_id, score).await?;
            ClusterStore::add_member(pool, cluster_id, record.id, score).await?;
            run.assigned += 1;
            cluster_id
        } else {
            let id = open_cluster(pool, &record, &normalized_topic, embedding_id).await?;
            run.created += 1;
            id
        };

        ClusterStore::recompute_rollups(pool, cluster_id).await?;
    }

    Ok(run)
}

/// Pick the best-matching cluster among `candidates` (score, cluster_id,
/// social_proof_count), breaking ties by higher social proof then lower id,
/// and return it only if its score clears `threshold` (§4.6).
fn best_match(candidates: &[(f64, i64, i32)], threshold: f64) -> Option<(f64, i64, i32)> {
    let mut best: Option<(f64, i64, i32)> = None;
    for &(score, cluster_id, proof) in candidates {
        let better = match best {
            None => true,
            Some((best_score, best_id, best_proof)) => {
                score > best_score || (score == best_score && (proof > best_proof || (proof == best_proof && cluster_id < best_id)))
            }
        };
        if better {
            best = Some((score, cluster_id, proof));
        }
    }
    best.filter(|(score, _, _)| *score >= threshold)
}

async fn open_cluster(
    pool: &PgPool,
    record: &painmine_store::pain::PainRecord,
    normalized_topic: &str,
    embedding_id: i64,
) -> Result<i64, sqlx::Error> {
    let mut centroid_text: String = record.raw_quote.clone();
    centroid_text.truncate(CENTROID_TEXT_LEN);

    let cluster_id = ClusterStore::create(
        pool,
        &NewCluster {
            centroid_text,
            topic_canonical: normalized_topic.to_string(),
            broad_category: category_of(normalized_topic).to_string(),
            centroid_embedding_id: embedding_id,
        },
    )
    .await?;

    PainStore::assign_cluster(pool, record.id, cluster_id, 1.0).await?;
    ClusterStore::add_member(pool, cluster_id, record.id, 1.0).await?;

    AlertStore::insert(
        pool,
        &NewAlert {
            alert_type: AlertType::NewCluster,
            cluster_id: Some(cluster_id),
            topic_canonical: Some(normalized_topic.to_string()),
            message: format!("new cluster opened for \"{}\"", normalized_topic),
            payload: None,
        },
    )
    .await?;

    Ok(cluster_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_above_threshold_matches() {
        let candidates = [(0.7, 1, 3)];
        assert_eq!(best_match(&candidates, CLUSTER_THRESHOLD), Some((0.7, 1, 3)));
    }

    #[test]
    fn score_below_threshold_opens_new_cluster() {
        let candidates = [(0.6, 1, 3)];
        assert_eq!(best_match(&candidates, CLUSTER_THRESHOLD), None);
    }

    #[test]
    fn ties_prefer_higher_social_proof_then_lower_id() {
        let candidates = [(0.9, 5, 1), (0.9, 2, 3), (0.9, 3, 3)];
        assert_eq!(best_match(&candidates, CLUSTER_THRESHOLD), Some((0.9, 2, 3)));
    }

    #[test]
    fn no_candidates_opens_new_cluster() {
        assert_eq!(best_match(&[], CLUSTER_THRESHOLD), None);
    }

    #[test]
    fn single_cluster_lifecycle_six_members_same_topic() {
        // Six records all scoring 0.9 against the same open cluster (all
        // "payout delay" in meaning) each match and accumulate onto it.
        let mut cluster_id = None;
        for _ in 0..6 {
            let candidates: Vec<(f64, i64, i32)> = match cluster_id {
                Some(id) => vec![(0.9, id, 1)],
                None => vec![],
            };
            let matched = best_match(&candidates, CLUSTER_THRESHOLD);
            cluster_id = Some(matched.map(|(_, id, _)| id).unwrap_or(1));
        }
        assert_eq!(cluster_id, Some(1));
    }
}
