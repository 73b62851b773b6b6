//! Read-time validation for JSON-encoded columns (`topics`, `subreddits_list`,
//! `top_quotes`, `sparkline`, `vector`, ...). Per the design note in §9:
//! JSON-in-a-column is acceptable for the relational store but MUST be
//! validated on read and truncated to declared bounds — never trust shape.

use serde::de::DeserializeOwned;

/// Parse a JSON column into `Vec<T>`, truncating to `max_len` and treating
/// malformed/missing JSON as an empty vec rather than propagating an error.
pub fn parse_bounded_array<T: DeserializeOwned>(raw: Option<&serde_json::Value>, max_len: usize) -> Vec<T> {
    let Some(value) = raw else { return Vec::new() };
    match serde_json::from_value::<Vec<T>>(value.clone()) {
        Ok(mut v) => {
            v.truncate(max_len);
            v
        }
        Err(_) => Vec::new(),
    }
}

/// Parse a JSON column expected to hold a fixed-dimension float vector.
/// Returns `None` if the shape doesn't match `expected_dims`.
pub fn parse_vector(raw: &serde_json::Value, expected_dims: usize) -> Option<Vec<f32>> {
    let v: Vec<f32> = serde_json::from_value(raw.clone()).ok()?;
    if v.len() != expected_dims {
        return None;
    }
    Some(v)
}

/// Round a vector's components to 4 decimal places before persisting, per
/// the Embedder's storage format.
pub fn round_vector(v: &[f32]) -> Vec<f32> {
    v.iter().map(|x| (x * 10000.0).round() / 10000.0).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncates_oversized_arrays() {
        let raw = serde_json::json!(["a", "b", "c", "d"]);
        let out: Vec<String> = parse_bounded_array(Some(&raw), 2);
        assert_eq!(out, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn malformed_json_yields_empty() {
        let raw = serde_json::json!({"not": "an array"});
        let out: Vec<String> = parse_bounded_array(Some(&raw), 5);
        assert!(out.is_empty());
    }

    #[test]
    fn vector_shape_mismatch_is_none() {
        let raw = serde_json::json!([1.0, 2.0, 3.0]);
        assert!(parse_vector(&raw, 1536).is_none());
        assert!(parse_vector(&raw, 3).is_some());
    }

    #[test]
    fn rounding_is_four_decimal_places() {
        let v = vec![0.123456_f32, -0.987654_f32];
        let rounded = round_vector(&v);
        assert_eq!(rounded, vec![0.1235, -0.9877]);
    }
}
