//! Agent Session Models
//!
//! The per-conversation session value: everything the UI needs to render
//! "what is happening in this conversation right now". Sessions are immutable
//! snapshots from the registry's point of view; all mutation happens on a
//! clone before the new snapshot is swapped in.

use std::collections::HashMap;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use sceneloom_core::{
    AskStatus, ConversationId, ConversationRecord, EventEnvelope, RunId, RunLifecycle,
    TerminalReason, ToolCallId, ToolStatus, ToolsSnapshot,
};

/// One tool invocation as tracked by the ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallRecord {
    pub id: ToolCallId,
    pub name: String,
    pub input: Option<serde_json::Value>,
    pub output: Option<String>,
    pub error: Option<String>,
    pub status: ToolStatus,
    pub requires_approval: bool,
    /// Timestamp (RFC 3339)
    pub started_at: String,
    pub completed_at: Option<String>,
}

impl ToolCallRecord {
    /// Create a record for a freshly announced tool call
    pub fn new(id: impl Into<ToolCallId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            input: None,
            output: None,
            error: None,
            status: ToolStatus::Pending,
            requires_approval: false,
            started_at: chrono::Utc::now().to_rfc3339(),
            completed_at: None,
        }
    }

    /// Case-insensitive tool-name match ("AskUserQuestion" vs "askuserquestion")
    pub fn is_named(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

/// A tool result that arrived before its tool call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrphanResult {
    pub result: Option<String>,
    pub is_error: bool,
}

/// One ask-user-question entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AskItem {
    pub tool_call_id: ToolCallId,
    /// The question payload (the tool call's input)
    pub question: Option<serde_json::Value>,
    pub status: AskStatus,
    /// Error code when status is Failed
    pub error: Option<String>,
    /// Timestamp (RFC 3339)
    pub created_at: String,
}

/// Ordered queue of ask-user-question items.
///
/// `order` is insertion-ordered and pruned to ids still present in `by_id`.
/// `active_id` is re-resolved on every mutation: keep the current active id
/// if still present; else the first Pending by order; else the first Failed
/// by order; else the first remaining item; else none.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AskQueue {
    pub by_id: HashMap<ToolCallId, AskItem>,
    pub order: Vec<ToolCallId>,
    pub active_id: Option<ToolCallId>,
}

impl AskQueue {
    /// Insert a pending item, or refresh an existing one back to Pending
    pub fn insert_pending(&mut self, id: &str, question: Option<serde_json::Value>) {
        match self.by_id.get_mut(id) {
            Some(item) => {
                item.status = AskStatus::Pending;
                item.error = None;
                if question.is_some() {
                    item.question = question;
                }
            }
            None => {
                self.by_id.insert(
                    id.to_string(),
                    AskItem {
                        tool_call_id: id.to_string(),
                        question,
                        status: AskStatus::Pending,
                        error: None,
                        created_at: chrono::Utc::now().to_rfc3339(),
                    },
                );
                self.order.push(id.to_string());
            }
        }
        self.settle();
    }

    /// Flip an item to Failed with an error code; kept visible for retry
    pub fn mark_failed(&mut self, id: &str, error: impl Into<String>) {
        if let Some(item) = self.by_id.get_mut(id) {
            item.status = AskStatus::Failed;
            item.error = Some(error.into());
        }
        self.settle();
    }

    /// Flip an item to Resolved
    pub fn mark_resolved(&mut self, id: &str) {
        if let Some(item) = self.by_id.get_mut(id) {
            item.status = AskStatus::Resolved;
            item.error = None;
        }
        self.settle();
    }

    /// Remove one item and re-resolve the active id
    pub fn remove(&mut self, id: &str) {
        self.by_id.remove(id);
        self.settle();
    }

    /// Drop the whole queue (stop/cancel path)
    pub fn clear(&mut self) {
        self.by_id.clear();
        self.order.clear();
        self.active_id = None;
    }

    /// Whether any item is still Pending
    pub fn has_pending(&self) -> bool {
        self.by_id.values().any(|i| i.status == AskStatus::Pending)
    }

    pub fn get(&self, id: &str) -> Option<&AskItem> {
        self.by_id.get(id)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Prune the order list and re-resolve `active_id`
    fn settle(&mut self) {
        let by_id = &self.by_id;
        self.order.retain(|id| by_id.contains_key(id));

        let still_present = self
            .active_id
            .as_deref()
            .is_some_and(|id| self.by_id.contains_key(id));
        if still_present {
            return;
        }

        let first_with = |status: AskStatus| {
            self.order
                .iter()
                .find(|id| self.by_id.get(*id).is_some_and(|i| i.status == status))
                .cloned()
        };
        self.active_id = first_with(AskStatus::Pending)
            .or_else(|| first_with(AskStatus::Failed))
            .or_else(|| self.order.first().cloned());
    }
}

/// An event buffered ahead of its run-start barrier
#[derive(Debug, Clone, PartialEq)]
pub struct BufferedEvent {
    pub envelope: EventEnvelope,
    /// Receipt time, for TTL pruning and replay ordering
    pub received_at: Instant,
}

/// One node of the visible trace log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Thought {
    /// Node kind ("text", "tool_call", "tool_result", "error", "compact", ...)
    pub kind: String,
    /// Identity for idempotent insertion, when the backend provides one
    pub id: Option<String>,
    pub content: Option<String>,
    pub tool_name: Option<String>,
    pub tool_call_id: Option<ToolCallId>,
    /// Timestamp (RFC 3339)
    pub timestamp: String,
}

/// A set of sub-agent tool calls observed running concurrently
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParallelGroup {
    pub agent_ids: Vec<ToolCallId>,
}

/// The per-conversation session state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentSession {
    pub conversation_id: ConversationId,
    /// The only run whose events are currently accepted
    pub active_run_id: Option<RunId>,
    pub lifecycle: RunLifecycle,
    pub terminal_reason: Option<TerminalReason>,
    /// When the active run started (RFC 3339, backend-reported)
    pub run_started_at: Option<String>,

    pub streaming_text: String,
    pub is_streaming: bool,
    /// Incremented whenever the backend signals a new text block
    pub text_block_version: u64,
    pub is_generating: bool,
    pub is_thinking: bool,

    pub tool_status_by_id: HashMap<ToolCallId, ToolStatus>,
    pub tool_calls_by_id: HashMap<ToolCallId, ToolCallRecord>,
    /// Results received with no matching call yet
    pub orphan_results: HashMap<ToolCallId, OrphanResult>,
    pub ask_user_questions: AskQueue,
    /// At most one tool awaiting human approval at a time
    pub pending_approval_tool_call: Option<ToolCallRecord>,

    /// Events for a run not yet barrier-confirmed (in-memory only)
    #[serde(skip)]
    pub pending_run_events: Vec<BufferedEvent>,

    pub thoughts: Vec<Thought>,
    pub parallel_groups: Vec<ParallelGroup>,
    pub active_agent_ids: Vec<ToolCallId>,

    pub available_tools: Option<ToolsSnapshot>,
    /// Cached authoritative conversation from the last successful reconcile
    pub conversation: Option<ConversationRecord>,
    /// Session-local error surface
    pub error: Option<String>,

    /// Durable cross-run UI preference, preserved across run-start resets
    pub plan_mode_enabled: bool,
}

impl AgentSession {
    /// Create an idle session for a conversation
    pub fn new(conversation_id: impl Into<ConversationId>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            active_run_id: None,
            lifecycle: RunLifecycle::Idle,
            terminal_reason: None,
            run_started_at: None,
            streaming_text: String::new(),
            is_streaming: false,
            text_block_version: 0,
            is_generating: false,
            is_thinking: false,
            tool_status_by_id: HashMap::new(),
            tool_calls_by_id: HashMap::new(),
            orphan_results: HashMap::new(),
            ask_user_questions: AskQueue::default(),
            pending_approval_tool_call: None,
            pending_run_events: Vec::new(),
            thoughts: Vec::new(),
            parallel_groups: Vec::new(),
            active_agent_ids: Vec::new(),
            available_tools: None,
            conversation: None,
            error: None,
            plan_mode_enabled: false,
        }
    }

    /// Fresh session for a newly accepted run.
    ///
    /// Everything is reset except the durable cross-run preferences and the
    /// cached persisted conversation (history, not run state).
    pub fn reset_for_run(&self, run_id: impl Into<RunId>, started_at: Option<String>) -> Self {
        let mut next = Self::new(self.conversation_id.clone());
        next.plan_mode_enabled = self.plan_mode_enabled;
        next.conversation = self.conversation.clone();
        next.active_run_id = Some(run_id.into());
        next.run_started_at = started_at;
        next.lifecycle = RunLifecycle::Running;
        next.is_generating = true;
        next
    }

    /// Cancel every tool still in flight; returns how many were cancelled
    pub fn cancel_in_flight_tools(&mut self) -> usize {
        let now = chrono::Utc::now().to_rfc3339();
        let mut cancelled = 0;
        for (id, status) in self.tool_status_by_id.iter_mut() {
            if status.is_running_like() {
                *status = ToolStatus::Cancelled;
                if let Some(record) = self.tool_calls_by_id.get_mut(id) {
                    record.status = ToolStatus::Cancelled;
                    record.completed_at = Some(now.clone());
                }
                cancelled += 1;
            }
        }
        self.pending_approval_tool_call = None;
        cancelled
    }

    /// Drop all ask-user-question state (stop/cancel path)
    pub fn clear_ask_state(&mut self) {
        self.ask_user_questions.clear();
    }

    /// Whether the given run id matches the accepted run
    pub fn accepts_run(&self, run_id: &str) -> bool {
        self.active_run_id.as_deref() == Some(run_id)
    }
}
