//! Engine Update Emitter
//!
//! Pushes engine updates (new session snapshots, the plan-tab trigger) to
//! whoever is rendering them, over an unbounded channel. Send failures mean
//! the consumer went away; they are logged, never fatal.

use std::sync::Arc;

use tokio::sync::mpsc;

use sceneloom_core::ConversationId;

use crate::models::session::AgentSession;

/// An update pushed by the reconciliation engine
#[derive(Debug, Clone)]
pub enum EngineUpdate {
    /// A session snapshot was replaced
    SessionChanged {
        conversation_id: ConversationId,
        session: Arc<AgentSession>,
    },
    /// The displayed conversation ended with a trailing plan message
    PlanReady { conversation_id: ConversationId },
}

/// Emitter side of the engine update channel
#[derive(Clone)]
pub struct UpdateEmitter {
    tx: mpsc::UnboundedSender<EngineUpdate>,
}

impl UpdateEmitter {
    /// Create an emitter and its receiving end
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<EngineUpdate>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Emit a session-changed update
    pub fn emit_session_changed(&self, session: Arc<AgentSession>) {
        let conversation_id = session.conversation_id.clone();
        self.emit(EngineUpdate::SessionChanged {
            conversation_id,
            session,
        });
    }

    /// Emit the plan-tab trigger for a conversation
    pub fn emit_plan_ready(&self, conversation_id: &str) {
        self.emit(EngineUpdate::PlanReady {
            conversation_id: conversation_id.to_string(),
        });
    }

    fn emit(&self, update: EngineUpdate) {
        if self.tx.send(update).is_err() {
            tracing::warn!("failed to emit engine update: receiver dropped");
        }
    }
}
