//! External Collaborator Traits
//!
//! The reconciliation engine talks to two collaborators it does not own: the
//! agent execution backend (starts and steers runs) and the persistent
//! conversation store (authoritative history). Both are specified only at
//! this interface; transports and persistence live in other crates.

use async_trait::async_trait;

use crate::conversation::ConversationRecord;
use crate::error::CoreResult;

/// The agent execution backend.
///
/// Every method is fallible; callers turn errors into session-local state
/// rather than propagating them across the reconciliation boundary.
#[async_trait]
pub trait AgentBackend: Send + Sync {
    /// Send a user message, starting or continuing a run
    async fn send_message(&self, conversation_id: &str, content: &str) -> CoreResult<()>;

    /// Stop the active run for a conversation
    async fn stop_generation(&self, conversation_id: &str, run_id: &str) -> CoreResult<()>;

    /// Approve a tool call waiting on human approval
    async fn approve_tool(&self, conversation_id: &str, tool_call_id: &str) -> CoreResult<()>;

    /// Reject a tool call waiting on human approval
    async fn reject_tool(&self, conversation_id: &str, tool_call_id: &str) -> CoreResult<()>;

    /// Answer an ask-user-question tool call
    async fn answer_question(
        &self,
        conversation_id: &str,
        tool_call_id: &str,
        answer: &str,
    ) -> CoreResult<()>;
}

/// The persistent conversation store
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Fetch the authoritative persisted conversation by id
    async fn fetch_conversation(&self, conversation_id: &str) -> CoreResult<ConversationRecord>;
}
