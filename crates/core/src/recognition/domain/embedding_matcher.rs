use thiserror::Error;

use crate::recognition::domain::face_embedding::{AuthorizedIdentity, FaceEmbedding};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MatchError {
    /// Candidate and reference come from encoders with different output
    /// sizes. This is a wiring bug, not something a user can fix.
    #[error("embedding dimension mismatch: authorized has {expected}, candidate has {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Result of comparing one candidate against the authorized identity.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MatchOutcome {
    pub is_match: bool,
    pub distance: f64,
}

/// Euclidean distance between two embeddings, accumulated in `f64`.
pub fn euclidean_distance(a: &FaceEmbedding, b: &FaceEmbedding) -> Result<f64, MatchError> {
    if a.len() != b.len() {
        return Err(MatchError::DimensionMismatch {
            expected: a.len(),
            actual: b.len(),
        });
    }
    let sum: f64 = a
        .as_slice()
        .iter()
        .zip(b.as_slice())
        .map(|(x, y)| {
            let d = *x as f64 - *y as f64;
            d * d
        })
        .sum();
    Ok(sum.sqrt())
}

/// A distance at or below the tolerance is a match.
pub fn is_within_tolerance(distance: f64, tolerance: f64) -> bool {
    distance <= tolerance
}

/// Compares candidates against the authorized identity with a fixed
/// tolerance (lower is stricter).
///
/// Stateless: safe to call from any thread.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EmbeddingMatcher {
    tolerance: f64,
}

impl EmbeddingMatcher {
    pub fn new(tolerance: f64) -> Self {
        Self { tolerance }
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    pub fn compare(
        &self,
        candidate: &FaceEmbedding,
        authorized: &AuthorizedIdentity,
    ) -> Result<MatchOutcome, MatchError> {
        let distance = euclidean_distance(authorized.embedding(), candidate)?;
        Ok(MatchOutcome {
            is_match: is_within_tolerance(distance, self.tolerance),
            distance,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    fn embedding(values: &[f32]) -> FaceEmbedding {
        FaceEmbedding::new(values.to_vec()).unwrap()
    }

    fn identity(values: &[f32]) -> AuthorizedIdentity {
        AuthorizedIdentity::new(embedding(values))
    }

    #[test]
    fn test_distance_identical_is_zero() {
        let a = embedding(&[0.25, -0.5, 0.75]);
        assert_eq!(euclidean_distance(&a, &a).unwrap(), 0.0);
    }

    #[test]
    fn test_distance_three_four_five() {
        let a = embedding(&[0.0, 0.0]);
        let b = embedding(&[3.0, 4.0]);
        assert_relative_eq!(euclidean_distance(&a, &b).unwrap(), 5.0);
    }

    #[test]
    fn test_distance_is_symmetric() {
        let a = embedding(&[0.1, 0.7, -0.3]);
        let b = embedding(&[0.4, -0.2, 0.9]);
        assert_relative_eq!(
            euclidean_distance(&a, &b).unwrap(),
            euclidean_distance(&b, &a).unwrap()
        );
    }

    #[test]
    fn test_distance_is_order_sensitive() {
        let a = embedding(&[1.0, 0.0]);
        let b = embedding(&[0.0, 1.0]);
        assert!(euclidean_distance(&a, &b).unwrap() > 0.0);
    }

    #[test]
    fn test_dimension_mismatch() {
        let matcher = EmbeddingMatcher::new(0.4);
        let result = matcher.compare(&embedding(&[0.0; 3]), &identity(&[0.0; 128]));
        assert_eq!(
            result,
            Err(MatchError::DimensionMismatch {
                expected: 128,
                actual: 3
            })
        );
    }

    #[rstest]
    #[case::exact(0.0, true)]
    #[case::just_inside(0.39, true)]
    #[case::on_boundary(0.40, true)]
    #[case::just_outside(0.41, false)]
    fn test_tolerance_boundary(#[case] distance: f64, #[case] expected: bool) {
        assert_eq!(is_within_tolerance(distance, 0.4), expected);
    }

    // Values below are exactly representable so the distances are exact.
    #[rstest]
    #[case::identical(&[0.0, 0.0], 0.0, true)]
    #[case::inside(&[0.25, 0.0], 0.25, true)]
    #[case::boundary(&[0.375, 0.0], 0.375, true)]
    #[case::outside(&[0.375, 0.5], 0.625, false)]
    fn test_compare_against_identity(
        #[case] candidate: &[f32],
        #[case] expected_distance: f64,
        #[case] expected_match: bool,
    ) {
        let matcher = EmbeddingMatcher::new(0.375);
        let outcome = matcher
            .compare(&embedding(candidate), &identity(&[0.0, 0.0]))
            .unwrap();
        assert_eq!(outcome.distance, expected_distance);
        assert_eq!(outcome.is_match, expected_match);
        assert_eq!(outcome.is_match, outcome.distance <= matcher.tolerance());
    }

    #[test]
    fn test_decreasing_distance_never_unmatches() {
        let matcher = EmbeddingMatcher::new(0.4);
        let reference = identity(&[0.0]);
        let mut seen_match = false;
        for step in (0..=20).rev() {
            let candidate = embedding(&[step as f32 * 0.05]);
            let outcome = matcher.compare(&candidate, &reference).unwrap();
            if seen_match {
                assert!(outcome.is_match, "match lost at distance {}", outcome.distance);
            }
            seen_match |= outcome.is_match;
        }
        assert!(seen_match);
    }
}
