//! Thought Log and Parallel-Agent Derivation
//!
//! Ordered trace log of "what the agent is doing", built from `thought`
//! events, from `process` events wrapping tool calls/results, from `compact`
//! notices, and from run errors. Insertion is idempotent on `(kind, id)`.
//! The parallel-group view is rebuilt from the full log on every insertion:
//! a sub-agent opens on a tool_call thought for the spawner tool and closes
//! on its tool_result thought; overlapping open intervals form groups.

use sceneloom_core::{
    CompactPayload, CompactTrigger, ProcessKind, ProcessPayload, ThoughtNode, ToolCallPayload,
    ToolResultPayload,
};

use crate::models::session::{AgentSession, ParallelGroup, Thought};

/// Tool name that spawns a sub-agent
pub const SUB_AGENT_TOOL: &str = "Task";

/// Insert a thought if its `(kind, id)` is not already present.
///
/// Returns whether the log changed. Thoughts without an id are always
/// appended; only identified thoughts deduplicate.
pub fn insert_thought(session: &mut AgentSession, thought: Thought) -> bool {
    if let Some(id) = &thought.id {
        let duplicate = session
            .thoughts
            .iter()
            .any(|t| t.kind == thought.kind && t.id.as_deref() == Some(id));
        if duplicate {
            tracing::debug!(
                conversation_id = %session.conversation_id,
                kind = %thought.kind,
                id = %id,
                "skipping duplicate thought"
            );
            return false;
        }
    }
    session.thoughts.push(thought);
    session.is_thinking = true;
    rebuild_parallel_groups(session);
    true
}

/// Build a thought from a free-form `thought` event node
pub fn thought_from_node(node: &ThoughtNode) -> Thought {
    Thought {
        kind: node.kind.clone().unwrap_or_else(|| "text".to_string()),
        id: node.id.clone(),
        content: node.content.clone(),
        tool_name: node.tool_name.clone(),
        tool_call_id: node.tool_call_id.clone(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    }
}

/// Derive a thought from a `process` event wrapping a tool call or result.
///
/// Returns `None` for process kinds that carry no trace node.
pub fn thought_from_process(payload: &ProcessPayload) -> Option<Thought> {
    match payload.process_kind {
        ProcessKind::ToolCall => {
            let inner: ToolCallPayload = serde_json::from_value(payload.payload.clone()).ok()?;
            Some(Thought {
                kind: "tool_call".to_string(),
                id: Some(inner.tool_call_id.clone()),
                content: None,
                tool_name: Some(inner.name),
                tool_call_id: Some(inner.tool_call_id),
                timestamp: chrono::Utc::now().to_rfc3339(),
            })
        }
        ProcessKind::ToolResult => {
            let inner: ToolResultPayload = serde_json::from_value(payload.payload.clone()).ok()?;
            Some(Thought {
                kind: "tool_result".to_string(),
                id: Some(inner.tool_call_id.clone()),
                content: inner.result,
                tool_name: None,
                tool_call_id: Some(inner.tool_call_id),
                timestamp: chrono::Utc::now().to_rfc3339(),
            })
        }
        ProcessKind::Other => None,
    }
}

/// Visible error thought for a backend-reported run error
pub fn error_thought(message: &str) -> Thought {
    Thought {
        kind: "error".to_string(),
        id: None,
        content: Some(message.to_string()),
        tool_name: None,
        tool_call_id: None,
        timestamp: chrono::Utc::now().to_rfc3339(),
    }
}

/// Compaction notice thought
pub fn compact_thought(payload: &CompactPayload) -> Thought {
    let trigger = match payload.trigger {
        CompactTrigger::Manual => "manual",
        CompactTrigger::Auto => "auto",
        CompactTrigger::Unknown => "unknown",
    };
    let content = match payload.pre_tokens {
        Some(tokens) => format!("Context compacted ({trigger}, {tokens} tokens before)"),
        None => format!("Context compacted ({trigger})"),
    };
    Thought {
        kind: "compact".to_string(),
        id: None,
        content: Some(content),
        tool_name: None,
        tool_call_id: None,
        timestamp: chrono::Utc::now().to_rfc3339(),
    }
}

/// Rebuild `parallel_groups` and `active_agent_ids` from the full thought log.
///
/// A sub-agent interval opens on a tool_call thought whose tool is the
/// spawner and closes on the tool_result thought with the same id. Each time
/// the set of concurrently open agents grows past one, that set is recorded
/// as a group (deduplicated against the previous recording).
pub fn rebuild_parallel_groups(session: &mut AgentSession) {
    let mut open: Vec<String> = Vec::new();
    let mut groups: Vec<ParallelGroup> = Vec::new();

    for thought in &session.thoughts {
        match thought.kind.as_str() {
            "tool_call" => {
                let is_spawner = thought
                    .tool_name
                    .as_deref()
                    .is_some_and(|n| n.eq_ignore_ascii_case(SUB_AGENT_TOOL));
                if is_spawner {
                    if let Some(id) = &thought.tool_call_id {
                        if !open.contains(id) {
                            open.push(id.clone());
                            if open.len() >= 2 {
                                let group = ParallelGroup {
                                    agent_ids: open.clone(),
                                };
                                if groups.last() != Some(&group) {
                                    groups.push(group);
                                }
                            }
                        }
                    }
                }
            }
            "tool_result" => {
                if let Some(id) = &thought.tool_call_id {
                    open.retain(|open_id| open_id != id);
                }
            }
            _ => {}
        }
    }

    session.parallel_groups = groups;
    session.active_agent_ids = open;
}
