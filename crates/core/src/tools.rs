//! Tool Descriptor Models
//!
//! Shapes for the `tools_available` snapshot the backend emits at run start
//! (and again whenever the tool set changes mid-run).

use serde::{Deserialize, Serialize};

/// One tool the backend can invoke
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDescriptor {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// JSON schema for the tool's input, when the backend publishes one
    #[serde(default)]
    pub input_schema: Option<serde_json::Value>,
}

/// Versioned snapshot of the available tool set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolsSnapshot {
    /// Monotonic version; stale snapshots are dropped
    pub snapshot_version: u64,
    #[serde(default)]
    pub emitted_at: Option<String>,
    pub tools: Vec<ToolDescriptor>,
    pub tool_count: usize,
}
