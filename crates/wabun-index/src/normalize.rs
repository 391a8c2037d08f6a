//! Vector normalization and similarity functions.

/// Compute the L2 (Euclidean) norm of a vector.
pub fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// L2-normalize a vector in-place. Zero vectors remain zero.
pub fn l2_normalize(v: &mut [f32]) {
    let norm = l2_norm(v);
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

/// Cosine similarity, or `None` when the dimensions differ. A zero vector
/// has similarity 0 with everything.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Option<f32> {
    if a.len() != b.len() {
        return None;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = l2_norm(a);
    let norm_b = l2_norm(b);
    if norm_a == 0.0 || norm_b == 0.0 {
        return Some(0.0);
    }
    Some(dot / (norm_a * norm_b))
}

/// Cosine distance (`1 - similarity`); lower means more similar.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> Option<f32> {
    cosine_similarity(a, b).map(|s| 1.0 - s)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-6;

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < EPSILON
    }

    #[test]
    fn l2_norm_known() {
        assert!(approx_eq(l2_norm(&[3.0, 4.0]), 5.0));
    }

    #[test]
    fn l2_normalize_known_vector() {
        let mut v = vec![3.0, 4.0];
        l2_normalize(&mut v);
        assert!(approx_eq(v[0], 0.6));
        assert!(approx_eq(v[1], 0.8));
    }

    #[test]
    fn l2_normalize_zero_vector() {
        let mut v = vec![0.0, 0.0, 0.0];
        l2_normalize(&mut v);
        assert!(v.iter().all(|x| *x == 0.0));
    }

    #[test]
    fn cosine_identical_and_orthogonal() {
        let v = [0.6, 0.8];
        assert!(approx_eq(cosine_similarity(&v, &v).unwrap(), 1.0));
        assert!(approx_eq(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).unwrap(), 0.0));
    }

    #[test]
    fn distance_of_opposites_is_two() {
        assert!(approx_eq(cosine_distance(&[1.0, 0.0], &[-1.0, 0.0]).unwrap(), 2.0));
    }

    #[test]
    fn mismatched_dimensions_yield_none() {
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), None);
    }

    #[test]
    fn zero_vector_similarity_is_zero() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), Some(0.0));
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn normalize_produces_unit(v in proptest::collection::vec(-100.0f32..100.0, 1..64)) {
                let has_nonzero = v.iter().any(|x| *x != 0.0);
                let mut v = v;
                l2_normalize(&mut v);
                if has_nonzero {
                    prop_assert!((l2_norm(&v) - 1.0).abs() < 1e-4);
                }
            }

            #[test]
            fn distance_within_bounds(
                a in proptest::collection::vec(-100.0f32..100.0, 8),
                b in proptest::collection::vec(-100.0f32..100.0, 8),
            ) {
                let d = cosine_distance(&a, &b).unwrap();
                prop_assert!((-1e-4..=2.0 + 1e-4).contains(&d));
            }
        }
    }
}
