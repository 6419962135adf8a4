//! Cosine similarity over signature feature vectors
//!
//! This is the retrieval metric of the store: a pure function, no state.
//! Feature components are non-negative by construction, so results land in
//! [0.0, 1.0] in practice.

use crate::error::{PrecedenteError, Result};

/// Compute the cosine similarity between two equal-length vectors.
///
/// Identical vectors yield 1.0, orthogonal vectors 0.0. A zero-norm input
/// yields 0.0 rather than dividing by zero. Mismatched lengths are a
/// programming error: silently padding or truncating would corrupt the
/// metric, so this fails loudly instead.
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> Result<f64> {
    if a.len() != b.len() {
        return Err(PrecedenteError::InvalidArgument(format!(
            "vector length mismatch: {} vs {}",
            a.len(),
            b.len()
        )));
    }

    let dot: f64 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f64>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return Ok(0.0);
    }

    Ok(dot / (norm_a * norm_b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const EPSILON: f64 = 1e-9;

    #[test]
    fn test_identical_vectors() {
        let v = vec![0.1, 0.2, 0.3, 0.4, 0.5];
        let sim = cosine_similarity(&v, &v).unwrap();
        assert!((sim - 1.0).abs() < EPSILON);
    }

    #[test]
    fn test_orthogonal_vectors() {
        let sim = cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).unwrap();
        assert!(sim.abs() < EPSILON);
    }

    #[test]
    fn test_zero_norm_yields_zero() {
        let sim = cosine_similarity(&[0.0, 0.0, 0.0], &[1.0, 2.0, 3.0]).unwrap();
        assert_eq!(sim, 0.0);
    }

    #[test]
    fn test_length_mismatch_is_invalid_argument() {
        let err = cosine_similarity(&[1.0, 2.0], &[1.0, 2.0, 3.0]).unwrap_err();
        assert!(matches!(
            err,
            crate::error::PrecedenteError::InvalidArgument(_)
        ));
    }

    #[test]
    fn test_near_identical_vectors_score_high() {
        // The fixture pair from the extraction pipeline's similarity tuning
        let a = [0.1, 0.2, 0.3, 0.4, 0.5];
        let b = [0.11, 0.21, 0.29, 0.41, 0.51];
        let sim = cosine_similarity(&a, &b).unwrap();
        assert!(sim >= 0.85, "expected >= 0.85, got {}", sim);
    }

    proptest! {
        #[test]
        fn prop_self_similarity_is_one(v in proptest::collection::vec(0.001f64..1.0, 1..20)) {
            let sim = cosine_similarity(&v, &v).unwrap();
            prop_assert!((sim - 1.0).abs() < 1e-6);
        }

        #[test]
        fn prop_symmetry(
            a in proptest::collection::vec(0.0f64..1.0, 10),
            b in proptest::collection::vec(0.0f64..1.0, 10),
        ) {
            let ab = cosine_similarity(&a, &b).unwrap();
            let ba = cosine_similarity(&b, &a).unwrap();
            prop_assert!((ab - ba).abs() < 1e-12);
        }

        #[test]
        fn prop_non_negative_inputs_bound_output(
            a in proptest::collection::vec(0.0f64..1.0, 10),
            b in proptest::collection::vec(0.0f64..1.0, 10),
        ) {
            let sim = cosine_similarity(&a, &b).unwrap();
            prop_assert!((-1e-12..=1.0 + 1e-12).contains(&sim));
        }
    }
}
