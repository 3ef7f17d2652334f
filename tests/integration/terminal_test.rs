//! Terminal reconciliation integration tests: authoritative reload, the
//! fallback path, the pending-question hold, stop, the plan-tab trigger, and
//! task finalization.

use sceneloom_core::{
    ConversationMessage, ConversationRecord, MessageRole, RunLifecycle, TerminalReason, ToolStatus,
};
use sceneloom_desktop::{EngineConfig, EngineUpdate};

use crate::support::{env, harness, harness_with, MockBackend, MockStore};

async fn started(h: &crate::support::Harness) {
    h.engine
        .handle_envelope(env(
            r#"{"conversationId":"conv-1","kind":"run_start","runId":"run-1"}"#,
        ))
        .await;
}

fn persisted(last_message_type: Option<&str>) -> ConversationRecord {
    let mut record = ConversationRecord::new("conv-1");
    let mut message = ConversationMessage::new("m1", MessageRole::Assistant, "the answer");
    message.message_type = last_message_type.map(String::from);
    record.messages.push(message);
    record
}

#[tokio::test]
async fn test_complete_replaces_conversation_from_store() {
    let h = harness_with(
        MockBackend::new(),
        MockStore::with_record(persisted(None)),
        EngineConfig::default(),
    );
    started(&h).await;
    h.engine
        .handle_envelope(env(
            r#"{"conversationId":"conv-1","kind":"message","runId":"run-1","delta":"typing..."}"#,
        ))
        .await;
    h.engine
        .handle_envelope(env(
            r#"{"conversationId":"conv-1","kind":"complete","runId":"run-1","reason":"completed"}"#,
        ))
        .await;

    let session = h.engine.session("conv-1").await.unwrap();
    assert_eq!(session.lifecycle, RunLifecycle::Completed);
    assert_eq!(session.terminal_reason, Some(TerminalReason::Completed));
    assert!(session.streaming_text.is_empty());
    assert_eq!(session.conversation.as_ref().unwrap().messages[0].content, "the answer");
}

#[tokio::test]
async fn test_fetch_failure_falls_back_to_final_content() {
    // Empty store: every fetch fails
    let h = harness();
    started(&h).await;
    h.engine
        .handle_envelope(env(
            r#"{"conversationId":"conv-1","kind":"message","runId":"run-1","delta":"typing..."}"#,
        ))
        .await;
    h.engine
        .handle_envelope(env(
            r#"{"conversationId":"conv-1","kind":"complete","runId":"run-1","reason":"completed","finalContent":"the last words"}"#,
        ))
        .await;

    let session = h.engine.session("conv-1").await.unwrap();
    let conversation = session.conversation.as_ref().unwrap();
    assert_eq!(conversation.messages.len(), 1);
    assert_eq!(conversation.messages[0].content, "the last words");
    assert_eq!(conversation.messages[0].role, MessageRole::Assistant);
    assert!(session.streaming_text.is_empty());
}

#[tokio::test]
async fn test_fetch_failure_without_content_clears_ghost_text() {
    let h = harness();
    started(&h).await;
    h.engine
        .handle_envelope(env(
            r#"{"conversationId":"conv-1","kind":"message","runId":"run-1","delta":"ghost"}"#,
        ))
        .await;
    h.engine
        .handle_envelope(env(
            r#"{"conversationId":"conv-1","kind":"complete","runId":"run-1","reason":"error"}"#,
        ))
        .await;

    let session = h.engine.session("conv-1").await.unwrap();
    assert!(session.streaming_text.is_empty());
    assert!(session.conversation.is_none());
    assert_eq!(session.lifecycle, RunLifecycle::Error);
}

#[tokio::test]
async fn test_no_text_reason_completes_the_lifecycle() {
    let h = harness_with(
        MockBackend::new(),
        MockStore::with_record(persisted(None)),
        EngineConfig::default(),
    );
    started(&h).await;
    h.engine
        .handle_envelope(env(
            r#"{"conversationId":"conv-1","kind":"complete","runId":"run-1","reason":"no_text"}"#,
        ))
        .await;

    let session = h.engine.session("conv-1").await.unwrap();
    assert_eq!(session.lifecycle, RunLifecycle::Completed);
    assert_eq!(session.terminal_reason, Some(TerminalReason::NoText));
}

#[tokio::test]
async fn test_completed_run_holds_for_pending_question() {
    let h = harness_with(
        MockBackend::new(),
        MockStore::with_record(persisted(None)),
        EngineConfig::default(),
    );
    started(&h).await;
    h.engine
        .handle_envelope(env(
            r#"{"conversationId":"conv-1","kind":"tool_call","runId":"run-1","toolCallId":"q1","name":"AskUserQuestion","status":"running"}"#,
        ))
        .await;
    h.engine
        .handle_envelope(env(
            r#"{"conversationId":"conv-1","kind":"complete","runId":"run-1","reason":"completed"}"#,
        ))
        .await;

    let session = h.engine.session("conv-1").await.unwrap();
    assert!(session.is_generating);
    assert_eq!(session.lifecycle, RunLifecycle::Running);
    assert_eq!(session.ask_user_questions.len(), 1);

    // The user answers and the backend resumes, then finishes for real
    h.engine.answer_question("conv-1", "q1", "yes").await.unwrap();
    h.engine
        .handle_envelope(env(
            r#"{"conversationId":"conv-1","kind":"tool_result","runId":"run-1","toolCallId":"q1","result":"yes"}"#,
        ))
        .await;
    h.engine
        .handle_envelope(env(
            r#"{"conversationId":"conv-1","kind":"complete","runId":"run-1","reason":"completed"}"#,
        ))
        .await;

    let session = h.engine.session("conv-1").await.unwrap();
    assert!(!session.is_generating);
    assert_eq!(session.lifecycle, RunLifecycle::Completed);
    assert!(session.ask_user_questions.is_empty());
}

#[tokio::test]
async fn test_stop_cancels_tools_and_calls_backend() {
    let h = harness_with(
        MockBackend::new(),
        MockStore::with_record(persisted(None)),
        EngineConfig::default(),
    );
    started(&h).await;
    h.engine
        .handle_envelope(env(
            r#"{"conversationId":"conv-1","kind":"tool_call","runId":"run-1","toolCallId":"tc-1","name":"Bash","status":"running"}"#,
        ))
        .await;

    h.engine.stop_generation("conv-1").await.unwrap();

    let session = h.engine.session("conv-1").await.unwrap();
    assert_eq!(session.lifecycle, RunLifecycle::Stopped);
    assert_eq!(session.tool_status_by_id["tc-1"], ToolStatus::Cancelled);
    assert!(h
        .backend
        .calls()
        .contains(&"stop_generation:conv-1:run-1".to_string()));
}

#[tokio::test]
async fn test_plan_ready_fires_only_for_displayed_conversation() {
    let mut h = harness_with(
        MockBackend::new(),
        MockStore::with_record(persisted(Some("plan"))),
        EngineConfig::default(),
    );
    started(&h).await;
    h.engine
        .handle_envelope(env(
            r#"{"conversationId":"conv-1","kind":"complete","runId":"run-1","reason":"completed"}"#,
        ))
        .await;

    // Not displayed: no plan trigger among the updates
    let mut saw_plan = false;
    while let Ok(update) = h.updates.try_recv() {
        if matches!(update, EngineUpdate::PlanReady { .. }) {
            saw_plan = true;
        }
    }
    assert!(!saw_plan);

    // Displayed: the next terminal reconcile triggers the plan tab
    h.engine.set_displayed_conversation(Some("conv-1")).await;
    h.engine
        .handle_envelope(env(
            r#"{"conversationId":"conv-1","kind":"run_start","runId":"run-2"}"#,
        ))
        .await;
    h.engine
        .handle_envelope(env(
            r#"{"conversationId":"conv-1","kind":"complete","runId":"run-2","reason":"completed"}"#,
        ))
        .await;

    let mut saw_plan = false;
    while let Ok(update) = h.updates.try_recv() {
        if matches!(update, EngineUpdate::PlanReady { ref conversation_id } if conversation_id == "conv-1")
        {
            saw_plan = true;
        }
    }
    assert!(saw_plan);
}

#[tokio::test]
async fn test_terminal_finalizes_tracked_tasks() {
    let h = harness_with(
        MockBackend::new(),
        MockStore::with_record(persisted(None)),
        EngineConfig::default(),
    );
    started(&h).await;
    h.engine.tracker().register_task("run-1", "t1", "summarize diff");

    h.engine
        .handle_envelope(env(
            r#"{"conversationId":"conv-1","kind":"complete","runId":"run-1","reason":"stopped"}"#,
        ))
        .await;

    let tasks = h.engine.tracker().tasks_for_run("run-1");
    assert!(tasks[0].finished);
    assert_eq!(tasks[0].outcome, Some(TerminalReason::Stopped));
}
