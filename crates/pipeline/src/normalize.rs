//! C7 topic normalization and rule-based similarity (deterministic half of
//! the Topic Merger, ahead of the LLM merge pass in `merger.rs`).

use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet};

static SYNONYMS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("clients", "customer"),
        ("client", "customer"),
        ("customers", "customer"),
        ("invoices", "invoice"),
        ("billing", "invoice"),
        ("payouts", "payout"),
        ("payments", "payment"),
        ("scheduling", "schedule"),
        ("appointments", "appointment"),
        ("bookings", "booking"),
        ("subscriptions", "subscription"),
        ("onboarding", "onboard"),
        ("signup", "onboard"),
        ("signups", "onboard"),
    ])
});

const STRIP_SUFFIXES: &[&str] = &["ization", "ments", "ment", "ness", "ing", "ers", "er", "s"];

fn strip_suffix(word: &str) -> String {
    if word.len() <= 4 {
        return word.to_string();
    }
    for suffix in STRIP_SUFFIXES {
        if let Some(stem) = word.strip_suffix(suffix) {
            if stem.len() >= 3 {
                return stem.to_string();
            }
        }
    }
    word.to_string()
}

/// Deterministic topic normalization (§4.7). Idempotent: `normalize(normalize(t)) == normalize(t)`.
pub fn normalize(topic: &str) -> String {
    let lowered = topic.to_lowercase().replace(['_', '-'], " ");
    let words: Vec<String> = lowered
        .split_whitespace()
        .map(|w| {
            let mapped = SYNONYMS.get(w).copied().unwrap_or(w);
            strip_suffix(mapped)
        })
        .collect();

    let mut deduped: Vec<String> = Vec::with_capacity(words.len());
    for w in words {
        if deduped.last() != Some(&w) {
            deduped.push(w);
        }
    }
    deduped.join(" ")
}

fn word_set(s: &str) -> HashSet<&str> {
    s.split_whitespace().collect()
}

fn jaccard(a: &str, b: &str) -> f64 {
    let wa = word_set(a);
    let wb = word_set(b);
    if wa.is_empty() && wb.is_empty() {
        return 1.0;
    }
    let intersection = wa.intersection(&wb).count();
    let union = wa.union(&wb).count();
    if union == 0 {
        0.0
    } else {
        intersection as f64 / union as f64
    }
}

/// Rule-based topic equivalence (§4.7): normalized equality, substring, or
/// Jaccard word-overlap above 0.6.
pub fn topics_match(a: &str, b: &str) -> bool {
    let (na, nb) = (normalize(a), normalize(b));
    if na == nb {
        return true;
    }
    if na.is_empty() || nb.is_empty() {
        return false;
    }
    if na.contains(&nb) || nb.contains(&na) {
        return true;
    }
    jaccard(&na, &nb) > 0.6
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization_is_a_fixed_point() {
        let t = "Client_Onboarding issues";
        let once = normalize(t);
        let twice = normalize(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn synonym_mapping_unifies_topics() {
        assert_eq!(normalize("client onboarding"), normalize("customer onboarding"));
    }

    #[test]
    fn underscores_and_hyphens_become_spaces() {
        assert_eq!(normalize("payout-delay"), normalize("payout delay"));
        assert_eq!(normalize("payout_delay"), normalize("payout delay"));
    }

    #[test]
    fn substring_match() {
        assert!(topics_match("invoice delay", "invoice delay for customer"));
    }

    #[test]
    fn jaccard_above_threshold_matches() {
        assert!(topics_match(
            "monthly invoice payment delay issue",
            "monthly invoice payment delay problem"
        ));
    }

    #[test]
    fn unrelated_topics_do_not_match() {
        assert!(!topics_match("payout delay", "dark mode missing"));
    }
}
