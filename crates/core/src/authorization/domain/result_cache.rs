use std::sync::Arc;

use crate::authorization::domain::frame_result::FrameResult;

/// Holds the most recently committed detection result.
///
/// Commits are ordered by frame counter: a result from an earlier frame
/// than the one already committed is rejected, so a slow detection can
/// never overwrite a newer one.
#[derive(Debug, Default)]
pub struct ResultCache {
    current: Arc<FrameResult>,
    committed_at: Option<u64>,
}

impl ResultCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the cached result wholesale. Returns `false` (and keeps the
    /// current result) when `frame_counter` is older than the last commit.
    pub fn commit(&mut self, frame_counter: u64, result: FrameResult) -> bool {
        if self.committed_at.is_some_and(|last| frame_counter < last) {
            log::warn!(
                "Dropping out-of-order detection result from frame {frame_counter} (cache is at frame {})",
                self.committed_at.unwrap_or_default()
            );
            return false;
        }
        self.current = Arc::new(result);
        self.committed_at = Some(frame_counter);
        true
    }

    /// Back to the locked placeholder, as if nothing had been detected.
    pub fn reset(&mut self) {
        self.current = Arc::new(FrameResult::default());
        self.committed_at = None;
    }

    pub fn current(&self) -> Arc<FrameResult> {
        Arc::clone(&self.current)
    }

    /// Frame counter of the detection that produced the current result.
    pub fn committed_at(&self) -> Option<u64> {
        self.committed_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authorization::domain::authorization_state::AuthorizationState;
    use crate::authorization::domain::frame_result::FaceObservation;
    use crate::recognition::domain::face_embedding::FaceEmbedding;
    use crate::shared::face_box::FaceBox;

    fn unlocked_result() -> FrameResult {
        FrameResult::from_observations(vec![FaceObservation {
            face_box: FaceBox::new(0, 10, 10, 0),
            embedding: FaceEmbedding::new(vec![0.0; 2]).unwrap(),
            distance: 0.0,
            is_authorized: true,
        }])
    }

    #[test]
    fn test_starts_with_locked_default() {
        let cache = ResultCache::new();
        assert_eq!(*cache.current(), FrameResult::default());
        assert_eq!(cache.current().state(), AuthorizationState::Locked);
        assert_eq!(cache.committed_at(), None);
    }

    #[test]
    fn test_commit_replaces_result() {
        let mut cache = ResultCache::new();
        assert!(cache.commit(10, unlocked_result()));
        assert_eq!(cache.current().state(), AuthorizationState::Unlocked);
        assert_eq!(cache.committed_at(), Some(10));
    }

    #[test]
    fn test_reads_share_the_committed_result() {
        let mut cache = ResultCache::new();
        cache.commit(10, unlocked_result());
        assert!(Arc::ptr_eq(&cache.current(), &cache.current()));
    }

    #[test]
    fn test_out_of_order_commit_rejected() {
        let mut cache = ResultCache::new();
        cache.commit(20, unlocked_result());
        assert!(!cache.commit(10, FrameResult::no_faces()));
        assert_eq!(cache.current().state(), AuthorizationState::Unlocked);
        assert_eq!(cache.committed_at(), Some(20));
    }

    #[test]
    fn test_reset_returns_to_locked() {
        let mut cache = ResultCache::new();
        cache.commit(10, unlocked_result());
        cache.reset();
        assert_eq!(cache.current().state(), AuthorizationState::Locked);
        assert_eq!(cache.committed_at(), None);
    }
}
