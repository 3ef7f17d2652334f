//! Sceneloom Desktop - Rust Backend Library
//!
//! Backend core of the Sceneloom desktop AI-chat application. It includes:
//! - The agent run reconciliation engine and its per-conversation sessions
//! - The session registry and engine update channel
//! - Application state wiring and error types

pub mod models;
pub mod services;
pub mod state;
pub mod utils;

// ── Session Models ─────────────────────────────────────────────────────
pub use models::session::{
    AgentSession, AskItem, AskQueue, BufferedEvent, OrphanResult, ParallelGroup, Thought,
    ToolCallRecord,
};
pub use models::settings::EngineConfig;

// ── Reconciliation Engine ──────────────────────────────────────────────
pub use services::agent_run::{
    AgentRunEngine, EngineUpdate, ReconcileRequest, SessionRegistry, TaskTracker, UpdateEmitter,
    ASK_USER_QUESTION_TOOL, SUB_AGENT_TOOL,
};

// ── State & Errors ─────────────────────────────────────────────────────
pub use state::AppState;
pub use utils::error::{AppError, AppResult};
