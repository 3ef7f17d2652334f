//! Sceneloom Core
//!
//! Foundational wire, lifecycle, and collaborator types for the Sceneloom
//! Desktop workspace. This crate has zero dependencies on application-level
//! code (session state, registries, the engine itself).
//!
//! ## Module Organization
//!
//! - `error` - Core error types (`CoreError`, `CoreResult`)
//! - `ids` - Opaque identifier aliases (`ConversationId`, `RunId`, `ToolCallId`)
//! - `lifecycle` - Run lifecycle, terminal reason, tool/ask status enums
//! - `events` - Wire event envelope and the kind-tagged `AgentEvent` union
//! - `conversation` - Persisted conversation models
//! - `tools` - Tool descriptor and snapshot models
//! - `traits` - External collaborator traits (`AgentBackend`, `ConversationStore`)
//!
//! ## Design Principles
//!
//! 1. **Zero external dependencies beyond serde/async-trait/thiserror/chrono** - keeps build times minimal
//! 2. **Trait-based abstractions** - enables mocking, testing, and future crate splitting
//! 3. **Unidirectional dependency** - this crate depends on nothing else in the workspace

pub mod conversation;
pub mod error;
pub mod events;
pub mod ids;
pub mod lifecycle;
pub mod tools;
pub mod traits;

// ── Error Types ────────────────────────────────────────────────────────
pub use error::{CoreError, CoreResult};

// ── Identifiers ────────────────────────────────────────────────────────
pub use ids::{ConversationId, RunId, ToolCallId};

// ── Lifecycle & Status ─────────────────────────────────────────────────
pub use lifecycle::{AskStatus, RunLifecycle, TerminalReason, ToolStatus};

// ── Wire Events ────────────────────────────────────────────────────────
pub use events::{
    decode_envelope, AgentEvent, CompactPayload, CompactTrigger, CompletePayload, ErrorPayload,
    EventEnvelope, MessagePayload, ProcessKind, ProcessPayload, ProcessVisibility,
    RunStartPayload, ThoughtNode, ThoughtPayload, ToolCallPayload, ToolResultPayload,
    ToolsAvailablePayload,
};

// ── Conversation Models ────────────────────────────────────────────────
pub use conversation::{ConversationMessage, ConversationRecord, MessageRole};

// ── Tool Models ────────────────────────────────────────────────────────
pub use tools::{ToolDescriptor, ToolsSnapshot};

// ── Collaborator Traits ────────────────────────────────────────────────
pub use traits::{AgentBackend, ConversationStore};
