//! `categoryOf` — buckets a normalized topic into a broad category for
//! `pain_clusters.broad_category` (§4.6 step 2). Not specified further by
//! the contract; a small fixed keyword map keeps cluster birth deterministic
//! without a second LLM round-trip.

const CATEGORIES: &[(&str, &[&str])] = &[
    ("payments", &["payout", "invoice", "payment", "billing", "refund", "subscription"]),
    ("scheduling", &["schedule", "appointment", "booking", "calendar"]),
    ("onboarding", &["onboard", "signup", "setup", "activation"]),
    ("communication", &["email", "notification", "message", "chat", "support"]),
    ("data", &["export", "import", "sync", "integration", "report"]),
];

pub fn category_of(normalized_topic: &str) -> &'static str {
    for (category, keywords) in CATEGORIES {
        if keywords.iter().any(|kw| normalized_topic.contains(kw)) {
            return category;
        }
    }
    "other"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_keyword_maps_to_category() {
        assert_eq!(category_of("payout delay"), "payments");
        assert_eq!(category_of("booking confirmation miss"), "scheduling");
    }

    #[test]
    fn unknown_topic_falls_back_to_other() {
        assert_eq!(category_of("dark mode missing"), "other");
    }
}
