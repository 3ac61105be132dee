/// Access decision exposed to consumers. Always derived, never assigned.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum AuthorizationState {
    #[default]
    Locked,
    Unlocked,
}

impl AuthorizationState {
    /// Unlocked only when exactly one face is in frame and it is the
    /// authorized one. Any additional face, authorized or not, denies.
    pub fn derive(face_count: usize, authorized_count: usize) -> Self {
        if face_count == 1 && authorized_count == 1 {
            AuthorizationState::Unlocked
        } else {
            AuthorizationState::Locked
        }
    }

    pub fn is_unlocked(&self) -> bool {
        matches!(self, AuthorizationState::Unlocked)
    }
}

impl std::fmt::Display for AuthorizationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthorizationState::Locked => write!(f, "LOCKED"),
            AuthorizationState::Unlocked => write!(f, "UNLOCKED"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::empty(0, 0, AuthorizationState::Locked)]
    #[case::stranger(1, 0, AuthorizationState::Locked)]
    #[case::owner(1, 1, AuthorizationState::Unlocked)]
    #[case::owner_and_stranger(2, 1, AuthorizationState::Locked)]
    #[case::two_authorized(2, 2, AuthorizationState::Locked)]
    #[case::crowd(5, 0, AuthorizationState::Locked)]
    fn test_derive(
        #[case] face_count: usize,
        #[case] authorized_count: usize,
        #[case] expected: AuthorizationState,
    ) {
        assert_eq!(
            AuthorizationState::derive(face_count, authorized_count),
            expected
        );
    }

    #[test]
    fn test_derive_exhaustive_small_counts() {
        for faces in 0..6 {
            for authorized in 0..=faces {
                let unlocked = AuthorizationState::derive(faces, authorized).is_unlocked();
                assert_eq!(unlocked, faces == 1 && authorized == 1, "({faces}, {authorized})");
            }
        }
    }

    #[test]
    fn test_default_is_locked() {
        assert_eq!(AuthorizationState::default(), AuthorizationState::Locked);
    }

    #[test]
    fn test_display() {
        assert_eq!(AuthorizationState::Locked.to_string(), "LOCKED");
        assert_eq!(AuthorizationState::Unlocked.to_string(), "UNLOCKED");
    }
}
