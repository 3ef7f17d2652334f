//! Session Registry
//!
//! Owns one session per conversation, independent of which conversation is
//! currently displayed. Sessions are stored as `Arc` snapshots; mutation is
//! copy-on-write (clone, apply, swap), so consumers can detect change with
//! a pointer comparison and handlers holding a stale snapshot mid-replay
//! are never aliased into.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use sceneloom_core::ConversationId;

use crate::models::session::AgentSession;

/// Registry of per-conversation sessions
pub struct SessionRegistry {
    /// Map of conversation ID to the current session snapshot
    sessions: RwLock<HashMap<ConversationId, Arc<AgentSession>>>,
    /// The conversation currently shown in the UI, for display-scoped effects
    displayed: RwLock<Option<ConversationId>>,
}

impl SessionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            displayed: RwLock::new(None),
        }
    }

    /// Current snapshot for a conversation, if one exists
    pub async fn get(&self, conversation_id: &str) -> Option<Arc<AgentSession>> {
        let sessions = self.sessions.read().await;
        sessions.get(conversation_id).cloned()
    }

    /// Current snapshot, creating an idle session lazily
    pub async fn get_or_create(&self, conversation_id: &str) -> Arc<AgentSession> {
        {
            let sessions = self.sessions.read().await;
            if let Some(session) = sessions.get(conversation_id) {
                return session.clone();
            }
        }
        let mut sessions = self.sessions.write().await;
        sessions
            .entry(conversation_id.to_string())
            .or_insert_with(|| Arc::new(AgentSession::new(conversation_id)))
            .clone()
    }

    /// Copy-on-write update: clone the current snapshot (or create one),
    /// apply the closure, swap in a new `Arc`, and return it.
    pub async fn update<F>(&self, conversation_id: &str, f: F) -> Arc<AgentSession>
    where
        F: FnOnce(&mut AgentSession),
    {
        let mut sessions = self.sessions.write().await;
        let mut next = sessions
            .get(conversation_id)
            .map(|s| (**s).clone())
            .unwrap_or_else(|| AgentSession::new(conversation_id));
        f(&mut next);
        let snapshot = Arc::new(next);
        sessions.insert(conversation_id.to_string(), snapshot.clone());
        snapshot
    }

    /// Remove a session (conversation deletion)
    pub async fn remove(&self, conversation_id: &str) -> bool {
        let mut sessions = self.sessions.write().await;
        sessions.remove(conversation_id).is_some()
    }

    /// Drop every session (app reset)
    pub async fn reset(&self) {
        let mut sessions = self.sessions.write().await;
        sessions.clear();
    }

    /// Snapshots of all sessions
    pub async fn list(&self) -> Vec<Arc<AgentSession>> {
        let sessions = self.sessions.read().await;
        sessions.values().cloned().collect()
    }

    /// Track which conversation the UI is displaying
    pub async fn set_displayed(&self, conversation_id: Option<&str>) {
        let mut displayed = self.displayed.write().await;
        *displayed = conversation_id.map(String::from);
    }

    /// The currently displayed conversation, if any
    pub async fn displayed(&self) -> Option<ConversationId> {
        self.displayed.read().await.clone()
    }

    /// Whether a conversation is the one currently displayed
    pub async fn is_displayed(&self, conversation_id: &str) -> bool {
        self.displayed.read().await.as_deref() == Some(conversation_id)
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
