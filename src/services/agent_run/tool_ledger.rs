//! Tool Call Ledger
//!
//! Per-conversation table of tool-call status and results. Results that
//! arrive before their call ("orphans") are held and merged once the call
//! shows up; a call is never fabricated from a result alone. Tool calls
//! named AskUserQuestion (case-insensitive) are mirrored into the ask queue
//! so the two views never disagree.

use sceneloom_core::{ToolCallPayload, ToolResultPayload, ToolStatus};

use crate::models::session::{AgentSession, OrphanResult, ToolCallRecord};

/// Tool name that blocks on human-provided input
pub const ASK_USER_QUESTION_TOOL: &str = "AskUserQuestion";

/// Apply a `tool_call` event: upsert the record, merge any orphaned result,
/// and maintain the approval slot and ask-queue consistency.
pub fn apply_tool_call(session: &mut AgentSession, payload: &ToolCallPayload) {
    let id = payload.tool_call_id.clone();

    let incoming_status = payload.status.unwrap_or(ToolStatus::Pending);
    if incoming_status == ToolStatus::Unknown {
        tracing::warn!(
            conversation_id = %session.conversation_id,
            tool_call_id = %id,
            "tool_call carried an unrecognized status, widening to Unknown"
        );
    }

    let mut record = session
        .tool_calls_by_id
        .get(&id)
        .cloned()
        .unwrap_or_else(|| ToolCallRecord::new(&id, &payload.name));
    record.name = payload.name.clone();
    if payload.input.is_some() {
        record.input = payload.input.clone();
    }
    record.status = incoming_status;
    record.requires_approval = payload.requires_approval;

    // A result may have arrived ahead of this call; merge it now
    if let Some(orphan) = session.orphan_results.remove(&id) {
        tracing::debug!(
            conversation_id = %session.conversation_id,
            tool_call_id = %id,
            "merging orphaned result into arriving tool call"
        );
        finish_record(&mut record, orphan.result, orphan.is_error);
    }

    if payload.requires_approval && record.status.is_running_like() {
        record.status = ToolStatus::WaitingApproval;
        session.pending_approval_tool_call = Some(record.clone());
    } else if session
        .pending_approval_tool_call
        .as_ref()
        .is_some_and(|p| p.id == id)
    {
        session.pending_approval_tool_call = None;
    }

    session.tool_status_by_id.insert(id.clone(), record.status);
    sync_ask_queue(session, &record);
    session.tool_calls_by_id.insert(id, record);
}

/// Apply a `tool_result` event. Results with no matching call are held as
/// orphans; matched results finalize the record.
pub fn apply_tool_result(session: &mut AgentSession, payload: &ToolResultPayload) {
    let id = payload.tool_call_id.clone();

    let Some(mut record) = session.tool_calls_by_id.get(&id).cloned() else {
        tracing::debug!(
            conversation_id = %session.conversation_id,
            tool_call_id = %id,
            "holding orphaned tool result until its call arrives"
        );
        session.orphan_results.insert(
            id,
            OrphanResult {
                result: payload.result.clone(),
                is_error: payload.is_error,
            },
        );
        return;
    };

    finish_record(&mut record, payload.result.clone(), payload.is_error);

    if session
        .pending_approval_tool_call
        .as_ref()
        .is_some_and(|p| p.id == id)
    {
        session.pending_approval_tool_call = None;
    }

    session.tool_status_by_id.insert(id.clone(), record.status);
    sync_ask_queue(session, &record);
    session.tool_calls_by_id.insert(id, record);
}

/// Attach a result to a record and set its final status
fn finish_record(record: &mut ToolCallRecord, result: Option<String>, is_error: bool) {
    if is_error {
        record.status = ToolStatus::Error;
        record.error = result;
    } else {
        record.status = ToolStatus::Success;
        record.output = result;
    }
    record.completed_at = Some(chrono::Utc::now().to_rfc3339());
}

/// Keep the ask queue consistent with an AskUserQuestion tool record:
/// running-like creates or refreshes a Pending item, success removes the
/// item, an error flips it to Failed, cancellation drops it.
fn sync_ask_queue(session: &mut AgentSession, record: &ToolCallRecord) {
    if !record.is_named(ASK_USER_QUESTION_TOOL) {
        return;
    }
    match record.status {
        s if s.is_running_like() => {
            session
                .ask_user_questions
                .insert_pending(&record.id, record.input.clone());
        }
        ToolStatus::Success => {
            session.ask_user_questions.remove(&record.id);
        }
        ToolStatus::Error => {
            session.ask_user_questions.mark_failed(
                &record.id,
                record.error.clone().unwrap_or_else(|| "tool_failed".to_string()),
            );
        }
        ToolStatus::Cancelled => {
            session.ask_user_questions.remove(&record.id);
        }
        _ => {}
    }
}
