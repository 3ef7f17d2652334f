//! Streaming Text Assembler
//!
//! Reconstructs assistant text from either full snapshots (`content`
//! replaces) or incremental deltas (`delta` appends). The two wire modes
//! coexist for backward compatibility. A new-text-block signal bumps
//! `text_block_version`; consumers use the version, not content equality,
//! to reset their incremental rendering offset.

use sceneloom_core::{MessagePayload, RunLifecycle};

use crate::models::session::AgentSession;

/// Apply a `message` event to the session's streaming text
pub fn apply_message(session: &mut AgentSession, payload: &MessagePayload) {
    if payload.is_new_text_block {
        session.text_block_version += 1;
    }

    if let Some(content) = &payload.content {
        // Full mode replaces outright
        session.streaming_text = content.clone();
    } else if let Some(delta) = &payload.delta {
        session.streaming_text.push_str(delta);
    }

    session.is_streaming = payload.is_streaming.unwrap_or(true);
    session.lifecycle = RunLifecycle::Running;
    session.is_generating = true;
}
