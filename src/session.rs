//! Conversation sessions.
//!
//! Each session keeps a bounded window of the most recent messages, which
//! the assistant feeds to the model as plain-text history.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Speaker {
    User,
    Assistant,
}

#[derive(Debug, Clone)]
struct Message {
    speaker: Speaker,
    content: String,
}

#[derive(Default)]
struct Sessions {
    next_id: u64,
    history: HashMap<String, Vec<Message>>,
}

/// Thread-safe store of conversation sessions.
pub struct SessionStore {
    max_history: usize,
    inner: Mutex<Sessions>,
}

impl SessionStore {
    /// Keep at most `max_history` exchanges (twice as many messages) per session.
    pub fn new(max_history: usize) -> Self {
        Self {
            max_history,
            inner: Mutex::new(Sessions::default()),
        }
    }

    fn sessions(&self) -> MutexGuard<'_, Sessions> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start a new, empty session and return its id.
    pub fn create_session(&self) -> String {
        let mut sessions = self.sessions();
        sessions.next_id += 1;
        let id = format!("session_{}", sessions.next_id);
        sessions.history.insert(id.clone(), Vec::new());
        debug!("Created {}", id);
        id
    }

    /// Whether `session_id` is known.
    pub fn contains(&self, session_id: &str) -> bool {
        self.sessions().history.contains_key(session_id)
    }

    /// Record a question and its answer. Unknown ids start a session under
    /// that id.
    pub fn add_exchange(&self, session_id: &str, question: &str, answer: &str) {
        let limit = self.max_history * 2;
        let mut sessions = self.sessions();
        let messages = sessions.history.entry(session_id.to_string()).or_default();

        messages.push(Message {
            speaker: Speaker::User,
            content: question.to_string(),
        });
        messages.push(Message {
            speaker: Speaker::Assistant,
            content: answer.to_string(),
        });

        if messages.len() > limit {
            let excess = messages.len() - limit;
            messages.drain(..excess);
        }
    }

    /// History formatted as `User: ...` / `Assistant: ...` lines.
    ///
    /// `None` for unknown ids and for sessions with no messages yet.
    pub fn history(&self, session_id: &str) -> Option<String> {
        let sessions = self.sessions();
        let messages = sessions.history.get(session_id)?;
        if messages.is_empty() {
            return None;
        }

        let lines: Vec<String> = messages
            .iter()
            .map(|m| match m.speaker {
                Speaker::User => format!("User: {}", m.content),
                Speaker::Assistant => format!("Assistant: {}", m.content),
            })
            .collect();
        Some(lines.join("\n"))
    }

    /// Forget a session's messages, keeping the id valid.
    pub fn clear(&self, session_id: &str) {
        if let Some(messages) = self.sessions().history.get_mut(session_id) {
            messages.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_sequential() {
        let store = SessionStore::new(2);
        assert_eq!(store.create_session(), "session_1");
        assert_eq!(store.create_session(), "session_2");
        assert!(store.contains("session_1"));
    }

    #[test]
    fn test_history_format() {
        let store = SessionStore::new(2);
        let id = store.create_session();
        assert_eq!(store.history(&id), None);

        store.add_exchange(&id, "Hello", "Hi there!");
        assert_eq!(
            store.history(&id).as_deref(),
            Some("User: Hello\nAssistant: Hi there!")
        );
    }

    #[test]
    fn test_history_is_bounded() {
        let store = SessionStore::new(2);
        let id = store.create_session();
        for i in 1..=3 {
            store.add_exchange(&id, &format!("q{}", i), &format!("a{}", i));
        }

        assert_eq!(
            store.history(&id).as_deref(),
            Some("User: q2\nAssistant: a2\nUser: q3\nAssistant: a3")
        );
    }

    #[test]
    fn test_unknown_session() {
        let store = SessionStore::new(2);
        assert_eq!(store.history("session_99"), None);
        assert!(!store.contains("session_99"));

        store.add_exchange("session_99", "q", "a");
        assert!(store.history("session_99").is_some());
    }

    #[test]
    fn test_clear_keeps_session() {
        let store = SessionStore::new(2);
        let id = store.create_session();
        store.add_exchange(&id, "q", "a");
        store.clear(&id);
        assert!(store.contains(&id));
        assert_eq!(store.history(&id), None);
    }
}
