use super::SessionStore;

/// Answers "is this identity connected right now", derived from live sessions.
#[derive(Clone)]
pub struct PresenceOracle {
    sessions: SessionStore,
}

impl PresenceOracle {
    pub fn new(sessions: SessionStore) -> Self {
        Self { sessions }
    }

    pub fn is_online(&self, identity: &str) -> bool {
        self.sessions.has_session_for(identity)
    }
}
