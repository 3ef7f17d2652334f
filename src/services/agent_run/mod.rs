//! Agent Run Reconciliation
//!
//! Reconciles the asynchronous, possibly out-of-order event stream from the
//! agent execution backend into consistent per-conversation sessions.
//!
//! - `barrier` - run-start barrier, pre-barrier buffering, staleness
//! - `tool_ledger` - tool-call status/result table with orphan merging
//! - `questions` - ask-user-question queue operations
//! - `streaming_text` - assistant text assembly (full and incremental modes)
//! - `thoughts` - trace log and parallel sub-agent derivation
//! - `terminal` - two-phase run termination and store reconcile
//! - `registry` - copy-on-write session registry
//! - `emitter` - update channel toward the rendering layer
//! - `task_tracker` - run-keyed background task finalization
//! - `engine` - the dispatch loop and user-initiated actions

pub mod barrier;
pub mod emitter;
pub mod engine;
pub mod questions;
pub mod registry;
pub mod streaming_text;
pub mod task_tracker;
pub mod terminal;
pub mod thoughts;
pub mod tool_ledger;

pub use barrier::Disposition;
pub use emitter::{EngineUpdate, UpdateEmitter};
pub use engine::AgentRunEngine;
pub use registry::SessionRegistry;
pub use task_tracker::{TaskTracker, TrackedTask};
pub use terminal::ReconcileRequest;
pub use thoughts::SUB_AGENT_TOOL;
pub use tool_ledger::ASK_USER_QUESTION_TOOL;
