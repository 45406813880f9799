//! Per-conversation session state.

use chrono::{DateTime, Utc};

use super::states::StateId;

/// Per-chat conversation context.
///
/// Holds only fixed fields; an abandoned session parks in its last state
/// indefinitely at negligible cost. The one-time code lives here so that
/// concurrent unauthenticated users never race a shared value.
#[derive(Debug, Clone)]
pub struct Session {
    /// State the next inbound message will be dispatched to.
    pub state: StateId,
    /// Live one-time code, if a challenge is pending.
    pub challenge: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

impl Session {
    pub fn new(entry: StateId) -> Self {
        let now = Utc::now();
        Self {
            state: entry,
            challenge: None,
            created_at: now,
            last_seen: now,
        }
    }

    /// Record activity on this session.
    pub fn touch(&mut self) {
        self.last_seen = Utc::now();
    }

    /// End the conversation: back to the entry state, challenge discarded.
    pub fn reset(&mut self, entry: StateId) {
        self.state = entry;
        self.challenge = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::states::StateRegistry;

    #[test]
    fn test_new_session_starts_at_entry() {
        let mut registry = StateRegistry::new();
        let entry = registry.register("entry");
        let session = Session::new(entry);
        assert_eq!(session.state, entry);
        assert!(session.challenge.is_none());
    }

    #[test]
    fn test_reset_clears_challenge() {
        let mut registry = StateRegistry::new();
        let entry = registry.register("entry");
        let other = registry.register("other");

        let mut session = Session::new(entry);
        session.state = other;
        session.challenge = Some("12345".to_string());

        session.reset(entry);
        assert_eq!(session.state, entry);
        assert!(session.challenge.is_none());
    }
}
