//! C13: Market Estimator, Feature Extractor, Outreach Builder, and Alert
//! Generator. All four are per-cluster enrichments; the orchestrator gates
//! the first two on cron parity to cap LLM spend (§4.13).

use painmine_llm::feature_extractor::{self, FeatureExtractionError};
use painmine_llm::market_estimator::{self, MarketEstimateError, MarketEstimateInput};
use painmine_llm::LlmProvider;
use painmine_store::alert::{AlertStore, AlertType, NewAlert};
use painmine_store::cluster::ClusterStore;
use painmine_store::feature::{FeatureStore, NewMvpFeature, Priority};
use painmine_store::market::{MarketStore, NewMarketEstimate};
use painmine_store::outreach::{NewOutreachContact, OutreachStore};
use painmine_store::trend::TrendStore;
use sqlx::PgPool;

const OUTREACH_MIN_SCORE: i64 = 50;
const GROWTH_ALERT_VELOCITY: f64 = 1.0;
const SYNTH_READY_FLOOR: i32 = 5;

fn priority_from_str(s: &str) -> Priority {
    match s {
        "must" => Priority::Must,
        "could" => Priority::Could,
        _ => Priority::Should,
    }
}

/// Estimate market size for every synthesized-but-unestimated cluster.
pub async fn run_market_estimator(pool: &PgPool, provider: &dyn LlmProvider) -> Result<u32, sqlx::Error> {
    let clusters = ClusterStore::all(pool).await?;
    let mut estimated = 0;

    for cluster in clusters {
        if cluster.product_name.is_none() {
            continue;
        }
        if MarketStore::by_cluster(pool, cluster.id).await?.is_some() {
            continue;
        }

        let input = MarketEstimateInput {
            topic: &cluster.topic_canonical,
            product_name: cluster.product_name.as_deref(),
            target_customer: cluster.target_customer.as_deref(),
            member_count: cluster.member_count,
            subreddit_count: cluster.subreddit_count,
        };

        match market_estimator::estimate(provider, &input).await {
            Ok(result) => {
                MarketStore::upsert(
                    pool,
                    &NewMarketEstimate {
                        cluster_id: cluster.id,
                        tam_low: Some(result.tam_low),
                        tam_high: Some(result.tam_high),
                        sam_estimate: Some(result.sam_estimate),
                        reasoning: Some(result.reasoning),
                        confidence: result.confidence,
                    },
                )
                .await?;
                estimated += 1;
            }
            Err(MarketEstimateError::Parse(msg, raw)) => {
                tracing::warn!(cluster_id = cluster.id, error = %msg, raw, "market estimate parse failed, skipping cluster");
            }
            Err(MarketEstimateError::Llm(e)) => {
                tracing::warn!(cluster_id = cluster.id, error = %e, "market estimate llm call failed");
            }
        }
    }

    Ok(estimated)
}

/// Extract MVP feature suggestions for every synthesized cluster.
pub async fn run_feature_extractor(pool: &PgPool, provider: &dyn LlmProvider) -> Result<u32, sqlx::Error> {
    let clusters = ClusterStore::all(pool).await?;
    let mut extracted = 0;

    for cluster in clusters {
        if cluster.product_name.is_none() {
            continue;
        }

        let members = ClusterStore::members_for_rollup(pool, cluster.id).await?;
        let quotes: Vec<String> = members.iter().map(|m| m.raw_quote.clone()).collect();
        if quotes.is_empty() {
            continue;
        }

        match feature_extractor::extract(provider, &cluster.topic_canonical, &quotes).await {
            Ok(suggestions) => {
                let rows: Vec<NewMvpFeature> = suggestions
                    .features
                    .into_iter()
                    .map(|f| NewMvpFeature {
                        cluster_id: cluster.id,
                        feature_name: f.feature_name,
                        description: f.description,
                        priority: priority_from_str(&f.priority),
                        effort_estimate: f.effort_estimate,
                    })
                    .collect();
                if !rows.is_empty() {
                    FeatureStore::replace_for_cluster(pool, cluster.id, &rows).await?;
                    extracted += 1;
                }
            }
            Err(FeatureExtractionError::Parse(msg, raw)) => {
                tracing::warn!(cluster_id = cluster.id, error = %msg, raw, "feature extraction parse failed, skipping cluster");
            }
            Err(FeatureExtractionError::Llm(e)) => {
                tracing::warn!(cluster_id = cluster.id, error = %e, "feature extraction llm call failed");
            }
        }
    }

    Ok(extracted)
}

/// Seed outreach contacts from high-signal members of scored clusters —
/// deterministic, no LLM call (§4.12-adjacent design, undocumented by the
/// contract beyond the table row: authors of the cluster's top-scoring
/// quotes are candidates for outreach).
pub async fn run_outreach_builder(pool: &PgPool) -> Result<u32, sqlx::Error> {
    let clusters = ClusterStore::all(pool).await?;
    let mut seeded = 0;

    for cluster in clusters {
        let Some(score) = cluster.total_score else { continue };
        if (score as i64) < OUTREACH_MIN_SCORE {
            continue;
        }

        let mut members = ClusterStore::members_for_rollup(pool, cluster.id).await?;
        members.sort_by(|a, b| b.source_score.cmp(&a.source_score));

        for member in members.iter().take(5) {
            let contact = NewOutreachContact {
                cluster_id: cluster.id,
                pain_record_id: member.pain_record_id,
                author: member.author.clone(),
                subreddit: member.subreddit.clone(),
                source_url: None,
            };
            if OutreachStore::seed(pool, &contact).await?.is_some() {
                seeded += 1;
            }
        }
    }

    Ok(seeded)
}

/// Raise alerts for newly-spiking topics, newly-opened clusters, clusters
/// ready for synthesis, and clusters showing sustained growth (§4.13 step 9).
pub async fn run_alert_checks(pool: &PgPool, date: chrono::NaiveDate) -> Result<u32, sqlx::Error> {
    let mut raised = 0;

    for trend in TrendStore::spiking(pool, date, 50).await? {
        if AlertStore::spike_already_fired(pool, &trend.topic_canonical).await? {
            continue;
        }
        let cluster_id = trend.cluster_id;
        AlertStore::insert(
            pool,
            &NewAlert {
                alert_type: AlertType::Spike,
                cluster_id,
                topic_canonical: Some(trend.topic_canonical.clone()),
                message: format!("\"{}\" is spiking: {} new mentions today", trend.topic_canonical, trend.new_mentions),
                payload: None,
            },
        )
        .await?;
        raised += 1;
    }

    for cluster in ClusterStore::all(pool).await? {
        if cluster.member_count >= SYNTH_READY_FLOOR && cluster.product_name.is_none() {
            if !AlertStore::alert_exists_for_cluster(pool, AlertType::SynthReady.as_str(), cluster.id).await? {
                AlertStore::insert(
                    pool,
                    &NewAlert {
                        alert_type: AlertType::SynthReady,
                        cluster_id: Some(cluster.id),
                        topic_canonical: Some(cluster.topic_canonical.clone()),
                        message: format!(
                            "\"{}\" cluster has reached {} members and is ready for synthesis",
                            cluster.topic_canonical, cluster.member_count
                        ),
                        payload: None,
                    },
                )
                .await?;
                raised += 1;
            }
        }

        if cluster.member_count >= 5 && cluster.member_count >= (cluster.last_synth_count as f64 * (1.0 + GROWTH_ALERT_VELOCITY)) as i32 && cluster.version > 0
        {
            if AlertStore::growth_already_fired(pool, cluster.id).await? {
                continue;
            }
            AlertStore::insert(
                pool,
                &NewAlert {
                    alert_type: AlertType::Growth,
                    cluster_id: Some(cluster.id),
                    topic_canonical: Some(cluster.topic_canonical.clone()),
                    message: format!("\"{}\" cluster doubled in size since last synthesis", cluster.topic_canonical),
                    payload: None,
                },
            )
            .await?;
            raised += 1;
        }
    }

    Ok(raised)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_parsing_defaults_to_should() {
        assert!(matches!(priority_from_str("must"), Priority::Must));
        assert!(matches!(priority_from_str("could"), Priority::Could));
        assert!(matches!(priority_from_str("garbage"), Priority::Should));
    }
}
