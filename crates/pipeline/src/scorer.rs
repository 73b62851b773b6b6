//! C9 Scorer — deterministic opportunity score from cluster rollups (§4.9).

use painmine_store::cluster::{ClusterStore, PainCluster};
use painmine_store::pain::Severity;
use sqlx::PgPool;

const SEVERITY_CAP: f64 = 25.0;

/// Deterministic opportunity score (§4.9). `severities` is one entry per
/// member with its severity (if tagged).
pub fn score_cluster(cluster: &PainCluster, severities: &[Option<Severity>]) -> f64 {
    let n = cluster.member_count.max(0) as f64;
    let size_component = (n + 1.0).log2() * 10.0;
    let size_component = size_component.min(40.0);

    let authors_component = if n > 0.0 {
        ((cluster.unique_authors as f64 / n.max(1.0)) * 20.0).min(15.0)
    } else {
        0.0
    };

    let diversity_component = ((cluster.subreddit_count as f64) * 2.0).min(10.0);

    let avg_upvotes = if n > 0.0 { cluster.total_upvotes as f64 / n } else { 0.0 };
    let intensity_component = ((avg_upvotes + 1.0).log2() * 2.0).min(10.0);

    let severity_sum: u32 = severities.iter().flatten().map(|s| s.weight()).sum();
    let severity_component = (severity_sum as f64).min(SEVERITY_CAP);

    (size_component + authors_component + diversity_component + intensity_component + severity_component).round()
}

/// Score every cluster with `member_count > 0` and persist (§4.9).
pub async fn run(pool: &PgPool) -> Result<u32, sqlx::Error> {
    let clusters = ClusterStore::all(pool).await?;
    let mut scored = 0;

    for cluster in clusters {
        if cluster.member_count == 0 {
            continue;
        }
        let members = ClusterStore::members_for_rollup(pool, cluster.id).await?;
        let severities: Vec<Option<Severity>> = members.iter().map(|m| m.severity.as_deref().and_then(Severity::from_str)).collect();
        let score = score_cluster(&cluster, &severities);
        ClusterStore::apply_score(pool, cluster.id, score).await?;
        scored += 1;
    }

    Ok(scored)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn fixture(member_count: i32, unique_authors: i32, subreddit_count: i32, total_upvotes: i64) -> PainCluster {
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
            last_synth_count: 0,
            version: 0,
            member_count,
            unique_authors,
            subreddit_count,
            total_upvotes,
            total_score: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            synthesized_at: None,
            scored_at: None,
            top_quotes: None,
            subreddits_list: None,
            categories: None,
        }
    }

    #[test]
    fn score_is_bounded_components() {
        let cluster = fixture(6, 6, 3, 600);
        let severities = vec![Some(Severity::Critical); 6];
        let score = score_cluster(&cluster, &severities);
        assert!(score > 0.0 && score <= 100.0);
    }

    #[test]
    fn zero_members_has_no_authors_or_intensity_blowup() {
        let cluster = fixture(0, 0, 0, 0);
        let score = score_cluster(&cluster, &[]);
        assert!(score.is_finite());
    }
}
