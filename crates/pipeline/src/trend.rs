//! C10 Trend Snapshotter — daily per-topic aggregates, velocity, spike
//! detection, and the `trend_summary` rollup (§4.10).

use chrono::NaiveDate;
use painmine_store::pain::PainStore;
use painmine_store::trend::{NewSnapshot, TrendStore};
use sqlx::PgPool;
use std::collections::HashMap;

const HISTORY_DAYS: i64 = 30;

/// `velocity := (today-yesterday)/yesterday`, or `1.0` if `yesterday=0` and
/// `today>0`, else `None` (§8 boundary behavior).
fn velocity(today: i32, yesterday: i32) -> Option<f64> {
    if yesterday == 0 {
        if today > 0 {
            Some(1.0)
        } else {
            None
        }
    } else {
        Some((today - yesterday) as f64 / yesterday as f64)
    }
}

fn is_spike(new_mentions: i32, history: &[i32]) -> bool {
    if history.is_empty() {
        return new_mentions >= 5;
    }
    let avg7: f64 = history.iter().rev().take(7).sum::<i32>() as f64 / history.iter().rev().take(7).count().max(1) as f64;
    new_mentions as f64 >= 3.0 * avg7
}

fn classify(spike: bool, v: Option<f64>) -> &'static str {
    if spike {
        return "hot";
    }
    match v {
        Some(v) if v >= 0.5 => "hot",
        Some(v) if v >= 0.1 => "rising",
        Some(v) if v >= -0.1 => "stable",
        None => "stable",
        Some(v) if v >= -0.3 => "cooling",
        _ => "cold",
    }
}

pub struct TrendRun {
    pub topics_snapshotted: u32,
}

/// Run one snapshotting pass for `date` (typically "today", UTC).
pub async fn run(pool: &PgPool, date: NaiveDate) -> Result<TrendRun, sqlx::Error> {
    let mention_counts: HashMap<String, i64> = PainStore::topic_mention_counts(pool, date).await?.into_iter().collect();
    let avg_severity: HashMap<String, Option<f64>> = PainStore::topic_avg_severity(pool, date).await?.into_iter().collect();
    let subreddit_spread: HashMap<String, i64> = PainStore::topic_subreddit_spread(pool, date).await?.into_iter().collect();

    let mut snapshotted = 0;

    for (topic, &today_count) in &mention_counts {
        let history = TrendStore::history(pool, topic, date, HISTORY_DAYS).await?;
        let daily_counts: Vec<i32> = history.iter().map(|(_, c)| *c).collect();
        let yesterday = daily_counts.last().copied().unwrap_or(0);
        let v = velocity(today_count as i32, yesterday);

        let v7 = history
            .iter()
            .rev()
            .nth(6)
            .map(|(_, c)| velocity(today_count as i32, *c))
            .unwrap_or(None);
        let v30 = history
            .iter()
            .rev()
            .nth(29)
            .map(|(_, c)| velocity(today_count as i32, *c))
            .unwrap_or(None);

        let new_mentions = today_count as i32 - yesterday;
        let spike = is_spike(new_mentions.max(0), &daily_counts);
        let status = classify(spike, v);

        let cluster_id = PainStore::first_cluster_for_topic(pool, topic).await?;

        TrendStore::upsert_snapshot(
            pool,
            &NewSnapshot {
                topic_canonical: topic.clone(),
                snapshot_date: date,
                cluster_id,
                mention_count: today_count as i32,
                new_mentions,
                velocity: v,
                velocity_7d: v7,
                velocity_30d: v30,
                trend_status: status.to_string(),
                is_spike: spike,
                avg_severity: avg_severity.get(topic).copied().flatten(),
                subreddit_spread: *subreddit_spread.get(topic).unwrap_or(&0) as i32,
            },
        )
        .await?;

        let mut sparkline = daily_counts.clone();
        sparkline.push(today_count as i32);
        if sparkline.len() > HISTORY_DAYS as usize {
            let drop = sparkline.len() - HISTORY_DAYS as usize;
            sparkline.drain(0..drop);
        }

        TrendStore::upsert_summary(pool, topic, today_count as i32, v, status, date, &sparkline).await?;

        snapshotted += 1;
    }

    Ok(TrendRun { topics_snapshotted: snapshotted })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn velocity_null_when_both_zero() {
        assert_eq!(velocity(0, 0), None);
    }

    #[test]
    fn velocity_one_when_yesterday_zero_and_today_positive() {
        assert_eq!(velocity(5, 0), Some(1.0));
    }

    #[test]
    fn velocity_standard_ratio() {
        assert_eq!(velocity(12, 2), Some(5.0));
    }

    #[test]
    fn spike_scenario_from_spec() {
        // daily counts for the last 7 days: [2,1,2,1,2,1,2], today = 12
        let history = vec![2, 1, 2, 1, 2, 1, 2];
        assert!(is_spike(10, &history));
    }

    #[test]
    fn no_history_spike_threshold_is_five() {
        assert!(is_spike(5, &[]));
        assert!(!is_spike(4, &[]));
    }

    #[test]
    fn classification_table() {
        assert_eq!(classify(true, None), "hot");
        assert_eq!(classify(false, Some(0.6)), "hot");
        assert_eq!(classify(false, Some(0.2)), "rising");
        assert_eq!(classify(false, Some(0.0)), "stable");
        assert_eq!(classify(false, None), "stable");
        assert_eq!(classify(false, Some(-0.2)), "cooling");
        assert_eq!(classify(false, Some(-0.5)), "cold");
    }
}
