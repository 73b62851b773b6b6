//! Cosine similarity over `f32` embedding vectors, chunked 4-wide to help
//! the compiler autovectorize (grounded in the same chunking pattern used
//! for topic-cluster distance matrices elsewhere in the corpus).

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot_product = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    let len = a.len().min(b.len());
    let chunks = len / 4;

    for i in 0..chunks {
        let idx = i * 4;
        for j in 0..4 {
            let ai = a[idx + j];
            let bi = b[idx + j];
            dot_product += ai * bi;
            norm_a += ai * ai;
            norm_b += bi * bi;
        }
    }
    for i in (chunks * 4)..len {
        let ai = a[i];
        let bi = b[i];
        dot_product += ai * bi;
        norm_a += ai * ai;
        norm_b += bi * bi;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot_product / (norm_a.sqrt() * norm_b.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_is_one() {
        let v = vec![0.3, 0.1, 0.8, 0.2, 0.5];
        let sim = cosine_similarity(&v, &v);
        assert!((sim - 1.0).abs() < 1e-6);
    }

    #[test]
    fn negation_is_minus_one() {
        let v = vec![0.3, 0.1, 0.8, 0.2, 0.5];
        let neg: Vec<f32> = v.iter().map(|x| -x).collect();
        let sim = cosine_similarity(&v, &neg);
        assert!((sim - (-1.0)).abs() < 1e-6);
    }

    #[test]
    fn orthogonal_is_zero() {
        let a = vec![1.0, 0.0];
        let b = vec![0.0, 1.0];
        assert!(cosine_similarity(&a, &b).abs() < 1e-6);
    }
}
