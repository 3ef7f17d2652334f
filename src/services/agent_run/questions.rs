//! Ask-User-Question Queue Operations
//!
//! Session-level operations on the ask queue: answer submission outcomes and
//! dismissal. The queue itself (ordering, active-id resolution) lives on the
//! session model; the ledger keeps it consistent with tool statuses.

use crate::models::session::AgentSession;

/// Record a successful answer submission.
///
/// The item flips to Resolved and stays until the backend confirms via a
/// later tool_result/tool_call update, which removes it through the ledger.
pub fn mark_answer_submitted(session: &mut AgentSession, tool_call_id: &str) {
    session.ask_user_questions.mark_resolved(tool_call_id);
}

/// Record a rejected answer submission; the item stays visible for retry
pub fn mark_answer_failed(session: &mut AgentSession, tool_call_id: &str, code: impl Into<String>) {
    session.ask_user_questions.mark_failed(tool_call_id, code);
}

/// Dismiss one question by id, or the whole queue when no id is given
/// (the stop/cancel path).
pub fn dismiss(session: &mut AgentSession, tool_call_id: Option<&str>) {
    match tool_call_id {
        Some(id) => session.ask_user_questions.remove(id),
        None => session.ask_user_questions.clear(),
    }
}
