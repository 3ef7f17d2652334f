//! Run Lifecycle and Status Enums
//!
//! Tagged unions for the run lifecycle, terminal reasons, tool statuses and
//! ask-item states. Backends ship new status strings without notice, so every
//! enum that crosses the wire carries an explicit fallback variant instead of
//! failing deserialization.

use serde::{Deserialize, Serialize};

/// Lifecycle of an agent run within a session.
///
/// Monotonic per run; reset to `Running` only via a run-start barrier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunLifecycle {
    /// No run active, waiting for input
    Idle,
    /// A run is actively producing events
    Running,
    /// The run finished normally
    Completed,
    /// The run was stopped (locally or by the backend)
    Stopped,
    /// The run ended with an error
    Error,
}

impl Default for RunLifecycle {
    fn default() -> Self {
        Self::Idle
    }
}

impl RunLifecycle {
    /// Whether this lifecycle value ends a run
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Stopped | Self::Error)
    }
}

/// Why a run reached a terminal state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalReason {
    /// The run finished normally
    Completed,
    /// The run was stopped before finishing
    Stopped,
    /// The backend reported an error
    Error,
    /// The run finished without producing any text
    NoText,
}

impl TerminalReason {
    /// The lifecycle value this terminal reason maps the session to
    pub fn lifecycle(&self) -> RunLifecycle {
        match self {
            Self::Completed | Self::NoText => RunLifecycle::Completed,
            Self::Stopped => RunLifecycle::Stopped,
            Self::Error => RunLifecycle::Error,
        }
    }
}

/// Status of a single tool call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolStatus {
    /// Announced but not yet executing
    Pending,
    /// Currently executing
    Running,
    /// Finished successfully
    Success,
    /// Finished with an error
    Error,
    /// Blocked on human approval
    WaitingApproval,
    /// Cancelled by a terminal event or rejection
    Cancelled,
    /// Status string the backend sent that we do not recognize
    #[serde(other)]
    Unknown,
}

impl Default for ToolStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl ToolStatus {
    /// Whether the tool is still in flight (cancellable by a terminal event)
    pub fn is_running_like(&self) -> bool {
        matches!(self, Self::Pending | Self::Running | Self::WaitingApproval)
    }

    /// Whether the tool has reached a final status
    pub fn is_final(&self) -> bool {
        matches!(self, Self::Success | Self::Error | Self::Cancelled)
    }
}

/// State of an ask-user-question item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AskStatus {
    /// Waiting for the user's answer
    Pending,
    /// Submission was rejected by the backend; retryable
    Failed,
    /// Answered successfully
    Resolved,
}
