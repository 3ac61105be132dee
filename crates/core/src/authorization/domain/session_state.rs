use crate::authorization::domain::result_cache::ResultCache;
use crate::authorization::domain::session_snapshot::{SessionSnapshot, SnapshotOrigin};
use crate::recognition::domain::face_embedding::AuthorizedIdentity;

/// Everything a running session remembers. Owned by a single writer.
///
/// Created only after enrollment succeeded; nothing here is persisted.
#[derive(Debug)]
pub struct SessionState {
    identity: AuthorizedIdentity,
    frame_counter: u64,
    cache: ResultCache,
}

impl SessionState {
    pub fn new(identity: AuthorizedIdentity) -> Self {
        Self {
            identity,
            frame_counter: 0,
            cache: ResultCache::new(),
        }
    }

    pub fn identity(&self) -> &AuthorizedIdentity {
        &self.identity
    }

    /// Counter of the last successfully read frame; 0 before the first.
    pub fn frame_counter(&self) -> u64 {
        self.frame_counter
    }

    /// Advances to the next frame and returns its counter (first frame is 1).
    pub fn advance(&mut self) -> u64 {
        self.frame_counter += 1;
        self.frame_counter
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut ResultCache {
        &mut self.cache
    }

    pub fn snapshot(&self, origin: SnapshotOrigin) -> SessionSnapshot {
        SessionSnapshot::new(self.frame_counter, origin, self.cache.current())
    }
}
