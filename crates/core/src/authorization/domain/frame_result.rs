use crate::authorization::domain::authorization_state::AuthorizationState;
use crate::recognition::domain::face_embedding::FaceEmbedding;
use crate::shared::face_box::FaceBox;

/// One detected face and how it compared to the authorized identity.
#[derive(Clone, Debug, PartialEq)]
pub struct FaceObservation {
    pub face_box: FaceBox,
    pub embedding: FaceEmbedding,
    pub distance: f64,
    pub is_authorized: bool,
}

/// Aggregate of one detection frame.
///
/// Built only from observations, so the counts and the derived state
/// always agree. The default value is the pre-detection placeholder:
/// no faces, locked.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrameResult {
    observations: Vec<FaceObservation>,
    authorized_count: usize,
    state: AuthorizationState,
}

impl FrameResult {
    pub fn from_observations(observations: Vec<FaceObservation>) -> Self {
        let authorized_count = observations.iter().filter(|o| o.is_authorized).count();
        let state = AuthorizationState::derive(observations.len(), authorized_count);
        Self {
            observations,
            authorized_count,
            state,
        }
    }

    /// Fail-safe result for a frame whose detection could not run.
    pub fn no_faces() -> Self {
        Self::default()
    }

    pub fn observations(&self) -> &[FaceObservation] {
        &self.observations
    }

    pub fn face_count(&self) -> usize {
        self.observations.len()
    }

    pub fn authorized_count(&self) -> usize {
        self.authorized_count
    }

    pub fn state(&self) -> AuthorizationState {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn observation(is_authorized: bool) -> FaceObservation {
        FaceObservation {
            face_box: FaceBox::new(10, 60, 60, 10),
            embedding: FaceEmbedding::new(vec![0.0; 4]).unwrap(),
            distance: if is_authorized { 0.1 } else { 0.9 },
            is_authorized,
        }
    }

    #[test]
    fn test_default_is_empty_and_locked() {
        let result = FrameResult::default();
        assert_eq!(result.face_count(), 0);
        assert_eq!(result.authorized_count(), 0);
        assert_eq!(result.state(), AuthorizationState::Locked);
        assert!(result.observations().is_empty());
        assert_eq!(FrameResult::no_faces(), result);
    }

    #[test]
    fn test_single_authorized_unlocks() {
        let result = FrameResult::from_observations(vec![observation(true)]);
        assert_eq!(result.face_count(), 1);
        assert_eq!(result.authorized_count(), 1);
        assert_eq!(result.state(), AuthorizationState::Unlocked);
    }

    #[test]
    fn test_counts_follow_observations() {
        let result = FrameResult::from_observations(vec![
            observation(false),
            observation(true),
            observation(false),
        ]);
        assert_eq!(result.face_count(), 3);
        assert_eq!(result.authorized_count(), 1);
        assert_eq!(result.state(), AuthorizationState::Locked);
    }

    #[test]
    fn test_observation_order_preserved() {
        let mut first = observation(true);
        first.face_box = FaceBox::new(0, 10, 10, 0);
        let mut second = observation(false);
        second.face_box = FaceBox::new(50, 90, 90, 50);

        let result = FrameResult::from_observations(vec![first.clone(), second.clone()]);
        assert_eq!(result.observations(), &[first, second]);
    }
}
