//! Session Management
//!
//! A session owns exactly one conversation for the lifetime of the process.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::message::Conversation;

/// Unique session identifier
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A complete agent session
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Session {
    /// Unique identifier
    pub id: SessionId,

    /// Conversation history
    pub conversation: Conversation,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last activity timestamp
    pub updated_at: DateTime<Utc>,

    /// Completed user turns
    pub turns: usize,

    /// Whether session is active
    pub active: bool,
}

impl Session {
    /// Create with system prompt
    pub fn new(system_prompt: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: SessionId::new(),
            conversation: Conversation::new(system_prompt),
            created_at: now,
            updated_at: now,
            turns: 0,
            active: true,
        }
    }

    /// Update the activity timestamp
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Count a finished turn
    pub fn record_turn(&mut self) {
        self.turns += 1;
        self.touch();
    }

    /// End the session
    pub fn end(&mut self) {
        self.active = false;
        self.touch();
    }

    /// Message count
    pub fn message_count(&self) -> usize {
        self.conversation.len()
    }

    /// Duration since creation
    pub fn duration(&self) -> chrono::Duration {
        self.updated_at - self.created_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_creation() {
        let session = Session::new("You are FinAI.");
        assert!(session.active);
        assert_eq!(session.message_count(), 1);
        assert_eq!(session.turns, 0);
    }

    #[test]
    fn test_session_lifecycle() {
        let mut session = Session::new("sys");
        session.record_turn();
        session.end();
        assert!(!session.active);
        assert_eq!(session.turns, 1);
        assert!(session.duration() >= chrono::Duration::zero());
    }

    #[test]
    fn test_session_ids_unique() {
        assert_ne!(SessionId::new(), SessionId::new());
    }
}
