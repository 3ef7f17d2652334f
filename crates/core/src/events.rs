//! Event Envelope and Agent Event Stream Types
//!
//! Wire types for the event stream delivered by the agent execution backend.
//! One envelope per event, tagged with the conversation it belongs to and a
//! `kind` discriminator. Wire JSON is camelCase; older transports used `id`
//! instead of `toolCallId` on tool calls and `toolId` on tool results, so
//! both spellings are accepted via serde aliases. Unknown kinds and statuses
//! deserialize into explicit fallback variants and are logged by the engine,
//! never treated as fatal.

use serde::{Deserialize, Serialize};

use crate::error::CoreResult;
use crate::ids::{ConversationId, RunId, ToolCallId};
use crate::lifecycle::{TerminalReason, ToolStatus};
use crate::tools::ToolDescriptor;

/// One event from the backend, addressed to a single conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventEnvelope {
    /// Conversation this event belongs to
    pub conversation_id: ConversationId,
    /// The event payload, tagged by `kind`
    #[serde(flatten)]
    pub event: AgentEvent,
}

impl EventEnvelope {
    /// Build an envelope for a conversation
    pub fn new(conversation_id: impl Into<ConversationId>, event: AgentEvent) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            event,
        }
    }
}

/// Decode one wire envelope from its JSON text
pub fn decode_envelope(json: &str) -> CoreResult<EventEnvelope> {
    Ok(serde_json::from_str(json)?)
}

/// Kind-tagged agent event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AgentEvent {
    /// Run-start barrier: authorizes acceptance of events for `run_id`
    RunStart(RunStartPayload),
    /// Assistant text, full snapshot or incremental delta
    Message(MessagePayload),
    /// Tool invocation announcement or status update
    ToolCall(ToolCallPayload),
    /// Tool execution result
    ToolResult(ToolResultPayload),
    /// Free-form trace node
    Thought(ThoughtPayload),
    /// Lower-level trace wrapping tool call/result payloads
    Process(ProcessPayload),
    /// Context compaction notice
    Compact(CompactPayload),
    /// Snapshot of the tools available to the run
    ToolsAvailable(ToolsAvailablePayload),
    /// Terminal event ending the run
    Complete(CompletePayload),
    /// Backend-reported run error (terminal)
    Error(ErrorPayload),
    /// Event kind this build does not recognize
    #[serde(other)]
    Unknown,
}

impl AgentEvent {
    /// The run this event is tagged with, if any
    pub fn run_id(&self) -> Option<&str> {
        match self {
            Self::RunStart(p) => Some(&p.run_id),
            Self::Message(p) => p.run_id.as_deref(),
            Self::ToolCall(p) => p.run_id.as_deref(),
            Self::ToolResult(p) => p.run_id.as_deref(),
            Self::Thought(p) => p.run_id.as_deref(),
            Self::Process(p) => Some(&p.run_id),
            Self::Compact(p) => p.run_id.as_deref(),
            Self::ToolsAvailable(p) => Some(&p.run_id),
            Self::Complete(p) => Some(&p.run_id),
            Self::Error(p) => p.run_id.as_deref(),
            Self::Unknown => None,
        }
    }

    /// Stable kind name for log lines
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::RunStart(_) => "run_start",
            Self::Message(_) => "message",
            Self::ToolCall(_) => "tool_call",
            Self::ToolResult(_) => "tool_result",
            Self::Thought(_) => "thought",
            Self::Process(_) => "process",
            Self::Compact(_) => "compact",
            Self::ToolsAvailable(_) => "tools_available",
            Self::Complete(_) => "complete",
            Self::Error(_) => "error",
            Self::Unknown => "unknown",
        }
    }
}

/// `run_start` payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunStartPayload {
    pub run_id: RunId,
    #[serde(default)]
    pub started_at: Option<String>,
}

/// `message` payload: full snapshot (`content`) or incremental (`delta`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePayload {
    #[serde(default)]
    pub run_id: Option<RunId>,
    /// Full replacement text (legacy wire mode)
    #[serde(default)]
    pub content: Option<String>,
    /// Incremental text to append
    #[serde(default)]
    pub delta: Option<String>,
    #[serde(default)]
    pub is_streaming: Option<bool>,
    /// Signals the start of a new text block
    #[serde(default)]
    pub is_new_text_block: bool,
}

/// `tool_call` payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallPayload {
    #[serde(default)]
    pub run_id: Option<RunId>,
    /// Older transports used `id`
    #[serde(alias = "id")]
    pub tool_call_id: ToolCallId,
    pub name: String,
    #[serde(default)]
    pub input: Option<serde_json::Value>,
    #[serde(default)]
    pub status: Option<ToolStatus>,
    #[serde(default)]
    pub requires_approval: bool,
}

/// `tool_result` payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResultPayload {
    #[serde(default)]
    pub run_id: Option<RunId>,
    /// Older transports used `toolId`
    #[serde(alias = "toolId")]
    pub tool_call_id: ToolCallId,
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub is_error: bool,
}

/// `thought` payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThoughtPayload {
    #[serde(default)]
    pub run_id: Option<RunId>,
    pub thought: ThoughtNode,
}

/// Free-form trace node carried by a `thought` event
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThoughtNode {
    /// Node kind ("text", "tool_call", "tool_result", "error", ...)
    #[serde(default, alias = "type")]
    pub kind: Option<String>,
    /// Identity for idempotent insertion, when the backend provides one
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, alias = "text")]
    pub content: Option<String>,
    #[serde(default)]
    pub tool_name: Option<String>,
    #[serde(default)]
    pub tool_call_id: Option<ToolCallId>,
}

/// `process` payload: lower-level trace wrapping tool call/result events.
///
/// The envelope discriminator already claims the `kind` field, so the wrapped
/// event's kind travels as `processKind`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessPayload {
    pub run_id: RunId,
    pub process_kind: ProcessKind,
    #[serde(default)]
    pub ts: Option<i64>,
    #[serde(default)]
    pub visibility: ProcessVisibility,
    #[serde(default)]
    pub payload: serde_json::Value,
}

/// Kind of a wrapped process event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessKind {
    ToolCall,
    ToolResult,
    #[serde(other)]
    Other,
}

/// Whether a process event should surface in the visible trace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessVisibility {
    Visible,
    Hidden,
    #[serde(other)]
    Other,
}

impl Default for ProcessVisibility {
    fn default() -> Self {
        Self::Visible
    }
}

/// `compact` payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompactPayload {
    #[serde(default)]
    pub run_id: Option<RunId>,
    pub trigger: CompactTrigger,
    #[serde(default)]
    pub pre_tokens: Option<u64>,
}

/// What initiated a context compaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompactTrigger {
    Manual,
    Auto,
    #[serde(other)]
    Unknown,
}

/// `tools_available` payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolsAvailablePayload {
    pub run_id: RunId,
    pub snapshot_version: u64,
    #[serde(default)]
    pub emitted_at: Option<String>,
    #[serde(default)]
    pub tools: Vec<ToolDescriptor>,
    #[serde(default)]
    pub tool_count: Option<usize>,
}

/// `complete` payload (terminal)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletePayload {
    pub run_id: RunId,
    /// Absent reason is treated as a normal completion
    #[serde(default)]
    pub reason: Option<TerminalReason>,
    /// Best-effort final text for the reconcile fallback path
    #[serde(default)]
    pub final_content: Option<String>,
}

/// `error` payload (terminal)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorPayload {
    #[serde(default)]
    pub run_id: Option<RunId>,
    pub error: String,
}
