//! Terminal Reconciler
//!
//! Ends a run in two phases. The synchronous phase cancels in-flight tools,
//! releases (or deliberately holds) the ask queue, and marks the lifecycle;
//! it returns a reconcile request for the asynchronous phase, which fetches
//! the authoritative persisted conversation and resolves with a second
//! synchronous apply. Resolution is guarded by the run id still being the
//! accepted one, so a run-start that lands during the fetch turns the
//! resolution into a no-op.

use sceneloom_core::{
    ConversationId, ConversationMessage, ConversationRecord, MessageRole, RunId, TerminalReason,
};

use crate::models::session::AgentSession;

/// Work order for the asynchronous reconcile phase
#[derive(Debug, Clone, PartialEq)]
pub struct ReconcileRequest {
    pub conversation_id: ConversationId,
    /// `None` on the pre-run/legacy path (untagged stream)
    pub run_id: Option<RunId>,
    pub reason: TerminalReason,
    /// Best-effort final text for the fallback path
    pub final_content: Option<String>,
}

/// Whether a terminal phase for `run_id` still applies to this session.
///
/// A tagged run must still be the accepted one; the untagged legacy path
/// applies only while the session has no run barrier at all.
fn run_matches(session: &AgentSession, run_id: Option<&str>) -> bool {
    match run_id {
        Some(id) => session.accepts_run(id),
        None => session.active_run_id.is_none(),
    }
}

/// Synchronous phase of a terminal event.
///
/// Cancels in-flight tools and finalizes the session, except when the run
/// completed while an ask-user-question is still pending: then the session
/// is held generating (the backend resumes after the answer) and no
/// reconcile request is produced.
pub fn apply_terminal(
    session: &mut AgentSession,
    run_id: Option<&str>,
    reason: TerminalReason,
    final_content: Option<String>,
) -> Option<ReconcileRequest> {
    session.cancel_in_flight_tools();

    if reason == TerminalReason::Completed && session.ask_user_questions.has_pending() {
        tracing::debug!(
            conversation_id = %session.conversation_id,
            run_id = ?run_id,
            "run completed with a pending question, holding session open"
        );
        session.is_generating = true;
        session.is_streaming = false;
        session.is_thinking = false;
        return None;
    }

    session.clear_ask_state();
    session.lifecycle = reason.lifecycle();
    session.terminal_reason = Some(reason);
    session.is_streaming = false;
    session.is_thinking = false;
    session.is_generating = false;

    Some(ReconcileRequest {
        conversation_id: session.conversation_id.clone(),
        run_id: run_id.map(String::from),
        reason,
        final_content,
    })
}

/// Resolve the reconcile with the authoritative persisted conversation.
///
/// Returns false when the guard failed (a new run took over mid-fetch).
pub fn resolve_with_conversation(
    session: &mut AgentSession,
    run_id: Option<&str>,
    conversation: ConversationRecord,
) -> bool {
    if !run_matches(session, run_id) {
        tracing::debug!(
            conversation_id = %session.conversation_id,
            run_id = ?run_id,
            "skipping reconcile resolution, run superseded during fetch"
        );
        return false;
    }
    session.conversation = Some(conversation);
    session.streaming_text.clear();
    session.is_streaming = false;
    true
}

/// Resolve the reconcile after a failed fetch.
///
/// When the terminal event carried final content, a locally-synthesized
/// assistant message is appended so the agent's last words are never
/// silently dropped; either way the streaming state is cleared to avoid a
/// stuck ghost bubble.
pub fn resolve_with_fallback(
    session: &mut AgentSession,
    run_id: Option<&str>,
    final_content: Option<String>,
) -> bool {
    if !run_matches(session, run_id) {
        tracing::debug!(
            conversation_id = %session.conversation_id,
            run_id = ?run_id,
            "skipping fallback resolution, run superseded during fetch"
        );
        return false;
    }

    if let Some(content) = final_content {
        let message = ConversationMessage::new(
            uuid::Uuid::new_v4().to_string(),
            MessageRole::Assistant,
            content,
        );
        session
            .conversation
            .get_or_insert_with(|| ConversationRecord::new(session.conversation_id.clone()))
            .messages
            .push(message);
    }

    session.streaming_text.clear();
    session.is_streaming = false;
    true
}
