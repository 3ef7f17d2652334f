//! Ask-user-question queue integration tests: single-active ordering,
//! answer submission outcomes, dismissal, and the backend confirmation
//! round trip.

use sceneloom_core::AskStatus;

use crate::support::{env, harness, harness_with, MockBackend, MockStore};
use sceneloom_desktop::{EngineConfig, EngineUpdate};

async fn started(h: &crate::support::Harness) {
    h.engine
        .handle_envelope(env(
            r#"{"conversationId":"conv-1","kind":"run_start","runId":"run-1"}"#,
        ))
        .await;
}

fn ask(id: &str) -> String {
    format!(
        r#"{{"conversationId":"conv-1","kind":"tool_call","runId":"run-1","toolCallId":"{id}","name":"AskUserQuestion","status":"running","input":{{"question":"pick one"}}}}"#
    )
}

#[tokio::test]
async fn test_only_first_question_is_active() {
    let h = harness();
    started(&h).await;
    for id in ["q1", "q2", "q3"] {
        h.engine.handle_envelope(env(&ask(id))).await;
    }

    let session = h.engine.session("conv-1").await.unwrap();
    assert_eq!(session.ask_user_questions.len(), 3);
    assert_eq!(session.ask_user_questions.active_id.as_deref(), Some("q1"));
    assert_eq!(
        session.ask_user_questions.get("q1").unwrap().question,
        Some(serde_json::json!({"question": "pick one"}))
    );
}

#[tokio::test]
async fn test_dismissing_active_advances_to_next() {
    let h = harness();
    started(&h).await;
    for id in ["q1", "q2", "q3"] {
        h.engine.handle_envelope(env(&ask(id))).await;
    }

    h.engine.dismiss_question("conv-1", Some("q1")).await.unwrap();
    let session = h.engine.session("conv-1").await.unwrap();
    assert_eq!(session.ask_user_questions.active_id.as_deref(), Some("q2"));
    assert_eq!(session.ask_user_questions.len(), 2);

    h.engine.dismiss_question("conv-1", None).await.unwrap();
    let session = h.engine.session("conv-1").await.unwrap();
    assert!(session.ask_user_questions.is_empty());
}

#[tokio::test]
async fn test_answer_resolves_then_backend_confirms() {
    let h = harness();
    started(&h).await;
    h.engine.handle_envelope(env(&ask("q1"))).await;

    h.engine.answer_question("conv-1", "q1", "option A").await.unwrap();
    let session = h.engine.session("conv-1").await.unwrap();
    // Resolved but kept until the backend confirms
    assert_eq!(
        session.ask_user_questions.get("q1").unwrap().status,
        AskStatus::Resolved
    );
    assert!(h
        .backend
        .calls()
        .contains(&"answer_question:conv-1:q1:option A".to_string()));

    // Backend confirmation arrives as a successful tool result
    h.engine
        .handle_envelope(env(
            r#"{"conversationId":"conv-1","kind":"tool_result","runId":"run-1","toolCallId":"q1","result":"option A"}"#,
        ))
        .await;
    let session = h.engine.session("conv-1").await.unwrap();
    assert!(session.ask_user_questions.is_empty());
}

#[tokio::test]
async fn test_rejected_answer_stays_actionable_for_retry() {
    let h = harness_with(
        MockBackend::refusing_answers(),
        MockStore::new(),
        EngineConfig::default(),
    );
    started(&h).await;
    h.engine.handle_envelope(env(&ask("q1"))).await;

    assert!(h.engine.answer_question("conv-1", "q1", "yes").await.is_err());
    let session = h.engine.session("conv-1").await.unwrap();
    let item = session.ask_user_questions.get("q1").unwrap();
    assert_eq!(item.status, AskStatus::Failed);
    assert!(item.error.as_deref().unwrap().contains("SUBMIT_REJECTED"));
    assert_eq!(session.ask_user_questions.active_id.as_deref(), Some("q1"));

    // The backend recovers; the retry resolves the same item
    h.backend
        .fail_answers
        .store(false, std::sync::atomic::Ordering::SeqCst);
    h.engine.answer_question("conv-1", "q1", "yes").await.unwrap();
    let session = h.engine.session("conv-1").await.unwrap();
    assert_eq!(
        session.ask_user_questions.get("q1").unwrap().status,
        AskStatus::Resolved
    );
}

#[tokio::test]
async fn test_answer_applies_optimistically_before_backend_rejection() {
    let mut h = harness_with(
        MockBackend::refusing_answers(),
        MockStore::new(),
        EngineConfig::default(),
    );
    started(&h).await;
    h.engine.handle_envelope(env(&ask("q1"))).await;
    while h.updates.try_recv().is_ok() {}

    assert!(h.engine.answer_question("conv-1", "q1", "yes").await.is_err());

    // The Resolved snapshot goes out before the backend call; the rejection
    // flips the item to Failed in a second snapshot.
    let mut statuses = Vec::new();
    while let Ok(update) = h.updates.try_recv() {
        if let EngineUpdate::SessionChanged { session, .. } = update {
            if let Some(item) = session.ask_user_questions.get("q1") {
                statuses.push(item.status);
            }
        }
    }
    assert_eq!(statuses, vec![AskStatus::Resolved, AskStatus::Failed]);
}

#[tokio::test]
async fn test_failed_question_tool_result_marks_item_failed() {
    let h = harness();
    started(&h).await;
    h.engine.handle_envelope(env(&ask("q1"))).await;

    h.engine
        .handle_envelope(env(
            r#"{"conversationId":"conv-1","kind":"tool_result","runId":"run-1","toolCallId":"q1","result":"delivery failed","isError":true}"#,
        ))
        .await;

    let session = h.engine.session("conv-1").await.unwrap();
    let item = session.ask_user_questions.get("q1").unwrap();
    assert_eq!(item.status, AskStatus::Failed);
    assert_eq!(item.error.as_deref(), Some("delivery failed"));
}
