//! Run barrier integration tests: pre-barrier buffering, replay order,
//! staleness, TTL eviction, and the buffer cap.

use std::time::Duration;

use sceneloom_core::{RunLifecycle, ToolStatus};
use sceneloom_desktop::EngineConfig;

use crate::support::{env, harness, harness_with, MockBackend, MockStore};

fn run_start(run: &str) -> String {
    format!(r#"{{"conversationId":"conv-1","kind":"run_start","runId":"{run}"}}"#)
}

fn delta(run: &str, text: &str) -> String {
    format!(r#"{{"conversationId":"conv-1","kind":"message","runId":"{run}","delta":"{text}"}}"#)
}

fn tool_call(run: &str, id: &str, name: &str) -> String {
    format!(
        r#"{{"conversationId":"conv-1","kind":"tool_call","runId":"{run}","toolCallId":"{id}","name":"{name}","status":"running"}}"#
    )
}

fn tool_result(run: &str, id: &str, result: &str) -> String {
    format!(
        r#"{{"conversationId":"conv-1","kind":"tool_result","runId":"{run}","toolCallId":"{id}","result":"{result}"}}"#
    )
}

#[tokio::test]
async fn test_events_before_barrier_match_in_order_application() {
    // The same event set, with the barrier arriving in the middle of one
    // stream and first in the other, must converge to the same state.
    let shuffled = harness();
    shuffled.engine.handle_envelope(env(&tool_call("run-1", "tc-1", "Read"))).await;
    shuffled.engine.handle_envelope(env(&delta("run-1", "Hel"))).await;
    shuffled.engine.handle_envelope(env(&run_start("run-1"))).await;
    shuffled.engine.handle_envelope(env(&delta("run-1", "lo"))).await;
    shuffled.engine.handle_envelope(env(&tool_result("run-1", "tc-1", "ok"))).await;

    let ordered = harness();
    ordered.engine.handle_envelope(env(&run_start("run-1"))).await;
    ordered.engine.handle_envelope(env(&tool_call("run-1", "tc-1", "Read"))).await;
    ordered.engine.handle_envelope(env(&delta("run-1", "Hel"))).await;
    ordered.engine.handle_envelope(env(&delta("run-1", "lo"))).await;
    ordered.engine.handle_envelope(env(&tool_result("run-1", "tc-1", "ok"))).await;

    let a = shuffled.engine.session("conv-1").await.unwrap();
    let b = ordered.engine.session("conv-1").await.unwrap();
    assert_eq!(a.streaming_text, "Hello");
    assert_eq!(a.streaming_text, b.streaming_text);
    assert_eq!(a.tool_status_by_id["tc-1"], ToolStatus::Success);
    assert_eq!(a.tool_status_by_id, b.tool_status_by_id);
    assert_eq!(a.lifecycle, b.lifecycle);
    assert_eq!(a.lifecycle, RunLifecycle::Running);
}

#[tokio::test]
async fn test_buffered_events_for_other_runs_discarded_on_barrier() {
    let h = harness();
    h.engine.handle_envelope(env(&tool_call("run-1", "tc-1", "Read"))).await;
    h.engine.handle_envelope(env(&tool_call("run-2", "tc-2", "Grep"))).await;
    h.engine.handle_envelope(env(&run_start("run-2"))).await;

    let session = h.engine.session("conv-1").await.unwrap();
    assert!(!session.tool_calls_by_id.contains_key("tc-1"));
    assert_eq!(session.tool_status_by_id["tc-2"], ToolStatus::Running);
    assert!(session.pending_run_events.is_empty());
}

#[tokio::test]
async fn test_stale_events_after_barrier_are_dropped() {
    let h = harness();
    h.engine.handle_envelope(env(&run_start("run-2"))).await;
    h.engine.handle_envelope(env(&delta("run-1", "stale text"))).await;
    h.engine.handle_envelope(env(&tool_call("run-1", "tc-1", "Read"))).await;

    let session = h.engine.session("conv-1").await.unwrap();
    assert!(session.streaming_text.is_empty());
    assert!(session.tool_calls_by_id.is_empty());
    assert!(session.pending_run_events.is_empty());
}

#[tokio::test]
async fn test_buffered_events_expire_after_ttl() {
    let h = harness_with(
        MockBackend::new(),
        MockStore::new(),
        EngineConfig {
            pending_event_ttl_ms: 50,
            pending_event_cap: 256,
        },
    );

    h.engine.handle_envelope(env(&tool_call("run-1", "tc-old", "Read"))).await;
    tokio::time::sleep(Duration::from_millis(120)).await;
    h.engine.handle_envelope(env(&tool_call("run-1", "tc-new", "Grep"))).await;
    h.engine.handle_envelope(env(&run_start("run-1"))).await;

    let session = h.engine.session("conv-1").await.unwrap();
    assert!(!session.tool_calls_by_id.contains_key("tc-old"));
    assert!(session.tool_calls_by_id.contains_key("tc-new"));
}

#[tokio::test]
async fn test_buffer_cap_evicts_oldest_first() {
    let h = harness_with(
        MockBackend::new(),
        MockStore::new(),
        EngineConfig {
            pending_event_ttl_ms: 2000,
            pending_event_cap: 2,
        },
    );

    h.engine.handle_envelope(env(&tool_call("run-1", "tc-1", "Read"))).await;
    h.engine.handle_envelope(env(&tool_call("run-1", "tc-2", "Grep"))).await;
    h.engine.handle_envelope(env(&tool_call("run-1", "tc-3", "Bash"))).await;
    h.engine.handle_envelope(env(&run_start("run-1"))).await;

    let session = h.engine.session("conv-1").await.unwrap();
    assert!(!session.tool_calls_by_id.contains_key("tc-1"));
    assert!(session.tool_calls_by_id.contains_key("tc-2"));
    assert!(session.tool_calls_by_id.contains_key("tc-3"));
}

#[tokio::test]
async fn test_untagged_stream_without_barrier_applies_directly() {
    // Legacy transports tag nothing; the whole stream applies as-is.
    let h = harness();
    h.engine
        .handle_envelope(env(r#"{"conversationId":"conv-1","kind":"message","delta":"plain"}"#))
        .await;

    let session = h.engine.session("conv-1").await.unwrap();
    assert_eq!(session.streaming_text, "plain");
    assert!(session.active_run_id.is_none());
}
