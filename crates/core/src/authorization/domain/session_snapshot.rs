use std::sync::Arc;

use crate::authorization::domain::authorization_state::AuthorizationState;
use crate::authorization::domain::frame_result::{FaceObservation, FrameResult};

/// How the result behind a snapshot came to be.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SnapshotOrigin {
    /// Detection ran on this frame and its result was committed.
    Fresh,
    /// Non-detection frame; the cached result was replayed.
    Replayed,
    /// Detection ran but its result was discarded; the cache was kept.
    Retained,
}

/// Read-only view of the session after one processed frame.
///
/// Cheap to clone; replayed snapshots share the very same [`FrameResult`]
/// as the detection frame that produced it.
#[derive(Clone, Debug)]
pub struct SessionSnapshot {
    frame_counter: u64,
    origin: SnapshotOrigin,
    result: Arc<FrameResult>,
}

impl SessionSnapshot {
    pub fn new(frame_counter: u64, origin: SnapshotOrigin, result: Arc<FrameResult>) -> Self {
        Self {
            frame_counter,
            origin,
            result,
        }
    }

    pub fn frame_counter(&self) -> u64 {
        self.frame_counter
    }

    pub fn origin(&self) -> SnapshotOrigin {
        self.origin
    }

    pub fn result(&self) -> &Arc<FrameResult> {
        &self.result
    }

    pub fn face_count(&self) -> usize {
        self.result.face_count()
    }

    pub fn authorized_count(&self) -> usize {
        self.result.authorized_count()
    }

    pub fn state(&self) -> AuthorizationState {
        self.result.state()
    }

    pub fn observations(&self) -> &[FaceObservation] {
        self.result.observations()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessors_delegate_to_result() {
        let snapshot = SessionSnapshot::new(3, SnapshotOrigin::Replayed, Arc::default());
        assert_eq!(snapshot.frame_counter(), 3);
        assert_eq!(snapshot.origin(), SnapshotOrigin::Replayed);
        assert_eq!(snapshot.face_count(), 0);
        assert_eq!(snapshot.authorized_count(), 0);
        assert_eq!(snapshot.state(), AuthorizationState::Locked);
        assert!(snapshot.observations().is_empty());
    }

    #[test]
    fn test_clone_shares_result() {
        let snapshot = SessionSnapshot::new(1, SnapshotOrigin::Fresh, Arc::default());
        let cloned = snapshot.clone();
        assert!(Arc::ptr_eq(snapshot.result(), cloned.result()));
    }
}
