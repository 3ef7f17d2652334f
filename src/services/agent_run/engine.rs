//! Agent Run Reconciliation Engine
//!
//! Single entry point for the backend event stream and for user-initiated
//! actions. Each envelope flows through the run barrier, is routed to the
//! matching handler, and mutates only the session registry; replayed
//! pre-barrier events are drained through an explicit queue by the same
//! dispatch loop, never by recursing into the dispatcher. Terminal events
//! produce reconcile requests whose store fetch happens outside the
//! registry lock, with a run-guarded resolution.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;

use sceneloom_core::{
    AgentBackend, AgentEvent, ConversationStore, EventEnvelope, TerminalReason, ToolCallPayload,
    ToolResultPayload, ToolStatus, ToolsAvailablePayload, ToolsSnapshot, ProcessKind,
    ProcessVisibility,
};

use crate::models::session::AgentSession;
use crate::models::settings::EngineConfig;
use crate::services::agent_run::barrier::{self, Disposition};
use crate::services::agent_run::emitter::{EngineUpdate, UpdateEmitter};
use crate::services::agent_run::registry::SessionRegistry;
use crate::services::agent_run::task_tracker::TaskTracker;
use crate::services::agent_run::terminal::{self, ReconcileRequest};
use crate::services::agent_run::{questions, streaming_text, thoughts, tool_ledger};
use crate::utils::{AppError, AppResult};

/// The reconciliation engine
pub struct AgentRunEngine {
    registry: Arc<SessionRegistry>,
    backend: Arc<dyn AgentBackend>,
    store: Arc<dyn ConversationStore>,
    emitter: UpdateEmitter,
    tracker: Arc<TaskTracker>,
    config: EngineConfig,
}

impl AgentRunEngine {
    /// Create an engine and the receiving end of its update channel
    pub fn new(
        backend: Arc<dyn AgentBackend>,
        store: Arc<dyn ConversationStore>,
        config: EngineConfig,
    ) -> (Self, mpsc::UnboundedReceiver<EngineUpdate>) {
        let (emitter, rx) = UpdateEmitter::channel();
        (
            Self {
                registry: Arc::new(SessionRegistry::new()),
                backend,
                store,
                emitter,
                tracker: Arc::new(TaskTracker::new()),
                config,
            },
            rx,
        )
    }

    /// The session registry
    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// The cross-cutting task tracker
    pub fn tracker(&self) -> &Arc<TaskTracker> {
        &self.tracker
    }

    /// Current session snapshot for a conversation
    pub async fn session(&self, conversation_id: &str) -> Option<Arc<AgentSession>> {
        self.registry.get(conversation_id).await
    }

    /// Decode and handle one wire envelope
    pub async fn handle_raw(&self, json: &str) -> AppResult<()> {
        let envelope = sceneloom_core::decode_envelope(json)?;
        self.handle_envelope(envelope).await;
        Ok(())
    }

    /// Handle one event envelope.
    ///
    /// Replay after a run-start barrier is drained through the same queue,
    /// so replayed events go through classification exactly like fresh ones.
    pub async fn handle_envelope(&self, envelope: EventEnvelope) {
        let now = Instant::now();
        let ttl = self.config.pending_event_ttl();
        let cap = self.config.pending_event_cap;

        let mut queue: VecDeque<EventEnvelope> = VecDeque::new();
        queue.push_back(envelope);
        let mut reconciles: Vec<ReconcileRequest> = Vec::new();

        while let Some(envelope) = queue.pop_front() {
            let conversation_id = envelope.conversation_id.clone();

            if let AgentEvent::RunStart(payload) = &envelope.event {
                let run_id = payload.run_id.clone();
                let started_at = payload.started_at.clone();
                let mut replay = Vec::new();
                let snapshot = self
                    .registry
                    .update(&conversation_id, |session| {
                        if let Some(active) = session.active_run_id.as_deref() {
                            if active != run_id {
                                tracing::debug!(
                                    conversation_id = %conversation_id,
                                    old_run = %active,
                                    new_run = %run_id,
                                    "run barrier takeover"
                                );
                            }
                        }
                        replay = barrier::take_matching(session, &run_id, now, ttl);
                        *session = session.reset_for_run(&run_id, started_at);
                    })
                    .await;
                self.emitter.emit_session_changed(snapshot);
                tracing::debug!(
                    conversation_id = %conversation_id,
                    run_id = %run_id,
                    replayed = replay.len(),
                    "run barrier established"
                );
                queue.extend(replay);
                continue;
            }

            let current = self.registry.get_or_create(&conversation_id).await;
            match barrier::classify(&current, &envelope.event) {
                Disposition::Apply => {
                    let event = envelope.event;
                    let mut request = None;
                    let snapshot = self
                        .registry
                        .update(&conversation_id, |session| {
                            request = self.apply_event(session, &event);
                        })
                        .await;
                    self.emitter.emit_session_changed(snapshot);

                    if let Some(request) = request {
                        if let Some(run_id) = &request.run_id {
                            self.tracker.finalize_run(run_id, request.reason);
                        }
                        reconciles.push(request);
                    }
                }
                Disposition::Buffer => {
                    self.registry
                        .update(&conversation_id, |session| {
                            barrier::buffer_event(session, envelope, now, ttl, cap);
                        })
                        .await;
                }
                Disposition::Stale => {
                    tracing::warn!(
                        conversation_id = %conversation_id,
                        kind = envelope.event.kind_name(),
                        run_id = ?envelope.event.run_id(),
                        active_run = ?current.active_run_id,
                        "dropping stale event"
                    );
                }
            }
        }

        for request in reconciles {
            self.resolve_reconcile(request).await;
        }
    }

    /// Route one accepted event to its handler. Synchronous; runs under the
    /// registry write lock.
    fn apply_event(
        &self,
        session: &mut AgentSession,
        event: &AgentEvent,
    ) -> Option<ReconcileRequest> {
        match event {
            AgentEvent::Message(payload) => {
                streaming_text::apply_message(session, payload);
                None
            }
            AgentEvent::ToolCall(payload) => {
                tool_ledger::apply_tool_call(session, payload);
                None
            }
            AgentEvent::ToolResult(payload) => {
                tool_ledger::apply_tool_result(session, payload);
                None
            }
            AgentEvent::Thought(payload) => {
                thoughts::insert_thought(session, thoughts::thought_from_node(&payload.thought));
                None
            }
            AgentEvent::Process(payload) => {
                // The ledger always sees the wrapped event; visibility only
                // gates the trace node.
                match payload.process_kind {
                    ProcessKind::ToolCall => {
                        match serde_json::from_value::<ToolCallPayload>(payload.payload.clone()) {
                            Ok(inner) => tool_ledger::apply_tool_call(session, &inner),
                            Err(err) => tracing::warn!(
                                conversation_id = %session.conversation_id,
                                error = %err,
                                "undecodable tool_call process payload"
                            ),
                        }
                    }
                    ProcessKind::ToolResult => {
                        match serde_json::from_value::<ToolResultPayload>(payload.payload.clone()) {
                            Ok(inner) => tool_ledger::apply_tool_result(session, &inner),
                            Err(err) => tracing::warn!(
                                conversation_id = %session.conversation_id,
                                error = %err,
                                "undecodable tool_result process payload"
                            ),
                        }
                    }
                    ProcessKind::Other => {}
                }
                if payload.visibility != ProcessVisibility::Hidden {
                    if let Some(thought) = thoughts::thought_from_process(payload) {
                        thoughts::insert_thought(session, thought);
                    }
                }
                None
            }
            AgentEvent::Compact(payload) => {
                thoughts::insert_thought(session, thoughts::compact_thought(payload));
                None
            }
            AgentEvent::ToolsAvailable(payload) => {
                self.apply_tools_snapshot(session, payload);
                None
            }
            AgentEvent::Complete(payload) => {
                let reason = payload.reason.unwrap_or(TerminalReason::Completed);
                terminal::apply_terminal(
                    session,
                    Some(&payload.run_id),
                    reason,
                    payload.final_content.clone(),
                )
            }
            AgentEvent::Error(payload) => {
                thoughts::insert_thought(session, thoughts::error_thought(&payload.error));
                session.error = Some(payload.error.clone());
                let run_id = payload
                    .run_id
                    .clone()
                    .or_else(|| session.active_run_id.clone());
                terminal::apply_terminal(session, run_id.as_deref(), TerminalReason::Error, None)
            }
            AgentEvent::Unknown => {
                tracing::warn!(
                    conversation_id = %session.conversation_id,
                    "ignoring event of unrecognized kind"
                );
                None
            }
            // Handled by the dispatch loop before routing
            AgentEvent::RunStart(_) => None,
        }
    }

    /// Replace the tools snapshot only when strictly newer
    fn apply_tools_snapshot(&self, session: &mut AgentSession, payload: &ToolsAvailablePayload) {
        let current_version = session.available_tools.as_ref().map(|s| s.snapshot_version);
        if current_version.is_some_and(|v| payload.snapshot_version <= v) {
            tracing::warn!(
                conversation_id = %session.conversation_id,
                incoming = payload.snapshot_version,
                current = ?current_version,
                "ignoring stale tools snapshot"
            );
            return;
        }
        session.available_tools = Some(ToolsSnapshot {
            snapshot_version: payload.snapshot_version,
            emitted_at: payload.emitted_at.clone(),
            tools: payload.tools.clone(),
            tool_count: payload.tool_count.unwrap_or(payload.tools.len()),
        });
    }

    /// Async phase of a terminal event: fetch the authoritative conversation
    /// outside the registry lock, then resolve under the run guard.
    async fn resolve_reconcile(&self, request: ReconcileRequest) {
        let run_id = request.run_id.as_deref();
        match self.store.fetch_conversation(&request.conversation_id).await {
            Ok(record) => {
                let mut resolved = false;
                let snapshot = self
                    .registry
                    .update(&request.conversation_id, |session| {
                        resolved = terminal::resolve_with_conversation(session, run_id, record);
                    })
                    .await;
                if resolved {
                    self.emitter.emit_session_changed(snapshot.clone());
                    self.maybe_emit_plan_ready(&snapshot).await;
                }
            }
            Err(err) => {
                tracing::error!(
                    conversation_id = %request.conversation_id,
                    run_id = ?run_id,
                    error = %err,
                    "conversation reload failed after terminal event, applying fallback"
                );
                let final_content = request.final_content.clone();
                let mut resolved = false;
                let snapshot = self
                    .registry
                    .update(&request.conversation_id, |session| {
                        resolved = terminal::resolve_with_fallback(session, run_id, final_content);
                    })
                    .await;
                if resolved {
                    self.emitter.emit_session_changed(snapshot);
                }
            }
        }
    }

    /// Trigger the plan tab when the displayed conversation ended on a plan
    async fn maybe_emit_plan_ready(&self, session: &AgentSession) {
        let trailing_plan = session
            .conversation
            .as_ref()
            .is_some_and(|c| c.trailing_plan_message().is_some());
        if trailing_plan && self.registry.is_displayed(&session.conversation_id).await {
            self.emitter.emit_plan_ready(&session.conversation_id);
        }
    }

    // ── User-initiated actions ──

    /// Send a user message; the session goes optimistically generating
    pub async fn send_message(&self, conversation_id: &str, content: &str) -> AppResult<()> {
        let snapshot = self
            .registry
            .update(conversation_id, |session| {
                session.is_generating = true;
                session.error = None;
            })
            .await;
        self.emitter.emit_session_changed(snapshot);

        if let Err(err) = self.backend.send_message(conversation_id, content).await {
            let message = err.to_string();
            tracing::error!(
                conversation_id = %conversation_id,
                error = %message,
                "send_message failed at the backend"
            );
            let error_text = message.clone();
            let snapshot = self
                .registry
                .update(conversation_id, |session| {
                    session.is_generating = false;
                    session.error = Some(error_text);
                })
                .await;
            self.emitter.emit_session_changed(snapshot);
            return Err(AppError::Backend(message));
        }
        Ok(())
    }

    /// Stop the active run. Applies the local terminal effect immediately;
    /// the backend's own trailing events for this run remain accepted until
    /// the next run-start.
    pub async fn stop_generation(&self, conversation_id: &str) -> AppResult<()> {
        let session = self
            .registry
            .get(conversation_id)
            .await
            .ok_or_else(|| AppError::not_found(format!("no session for {conversation_id}")))?;
        let Some(run_id) = session.active_run_id.clone() else {
            return Err(AppError::validation("no active run to stop"));
        };

        let mut request = None;
        let snapshot = self
            .registry
            .update(conversation_id, |session| {
                request =
                    terminal::apply_terminal(session, Some(&run_id), TerminalReason::Stopped, None);
            })
            .await;
        self.emitter.emit_session_changed(snapshot);
        self.tracker.finalize_run(&run_id, TerminalReason::Stopped);

        if let Err(err) = self.backend.stop_generation(conversation_id, &run_id).await {
            tracing::warn!(
                conversation_id = %conversation_id,
                run_id = %run_id,
                error = %err,
                "backend stop failed after local stop"
            );
        }
        if let Some(request) = request {
            self.resolve_reconcile(request).await;
        }
        Ok(())
    }

    /// Approve the tool call waiting on human approval
    pub async fn approve_tool(&self, conversation_id: &str, tool_call_id: &str) -> AppResult<()> {
        let snapshot = self
            .registry
            .update(conversation_id, |session| {
                if let Some(record) = session.tool_calls_by_id.get_mut(tool_call_id) {
                    record.status = ToolStatus::Running;
                    session
                        .tool_status_by_id
                        .insert(tool_call_id.to_string(), ToolStatus::Running);
                }
                if session
                    .pending_approval_tool_call
                    .as_ref()
                    .is_some_and(|p| p.id == tool_call_id)
                {
                    session.pending_approval_tool_call = None;
                }
            })
            .await;
        self.emitter.emit_session_changed(snapshot);

        self.backend
            .approve_tool(conversation_id, tool_call_id)
            .await
            .map_err(|err| {
                tracing::error!(
                    conversation_id = %conversation_id,
                    tool_call_id = %tool_call_id,
                    error = %err,
                    "approve_tool failed at the backend"
                );
                AppError::Backend(err.to_string())
            })
    }

    /// Reject the tool call waiting on human approval
    pub async fn reject_tool(&self, conversation_id: &str, tool_call_id: &str) -> AppResult<()> {
        let snapshot = self
            .registry
            .update(conversation_id, |session| {
                if let Some(record) = session.tool_calls_by_id.get_mut(tool_call_id) {
                    record.status = ToolStatus::Cancelled;
                    record.completed_at = Some(chrono::Utc::now().to_rfc3339());
                    session
                        .tool_status_by_id
                        .insert(tool_call_id.to_string(), ToolStatus::Cancelled);
                }
                if session
                    .pending_approval_tool_call
                    .as_ref()
                    .is_some_and(|p| p.id == tool_call_id)
                {
                    session.pending_approval_tool_call = None;
                }
            })
            .await;
        self.emitter.emit_session_changed(snapshot);

        self.backend
            .reject_tool(conversation_id, tool_call_id)
            .await
            .map_err(|err| {
                tracing::error!(
                    conversation_id = %conversation_id,
                    tool_call_id = %tool_call_id,
                    error = %err,
                    "reject_tool failed at the backend"
                );
                AppError::Backend(err.to_string())
            })
    }

    /// Answer an ask-user-question tool call. The item optimistically flips
    /// to Resolved before the backend call; on rejection it is flipped back
    /// to Failed with the error code and stays actionable for retry.
    pub async fn answer_question(
        &self,
        conversation_id: &str,
        tool_call_id: &str,
        answer: &str,
    ) -> AppResult<()> {
        let snapshot = self
            .registry
            .update(conversation_id, |session| {
                questions::mark_answer_submitted(session, tool_call_id);
            })
            .await;
        self.emitter.emit_session_changed(snapshot);

        if let Err(err) = self
            .backend
            .answer_question(conversation_id, tool_call_id, answer)
            .await
        {
            let code = err.to_string();
            tracing::warn!(
                conversation_id = %conversation_id,
                tool_call_id = %tool_call_id,
                error = %code,
                "answer submission rejected by the backend"
            );
            let failed_code = code.clone();
            let snapshot = self
                .registry
                .update(conversation_id, |session| {
                    questions::mark_answer_failed(session, tool_call_id, failed_code);
                })
                .await;
            self.emitter.emit_session_changed(snapshot);
            return Err(AppError::Backend(code));
        }
        Ok(())
    }

    /// Dismiss one question, or the whole queue when no id is given
    pub async fn dismiss_question(
        &self,
        conversation_id: &str,
        tool_call_id: Option<&str>,
    ) -> AppResult<()> {
        let snapshot = self
            .registry
            .update(conversation_id, |session| {
                questions::dismiss(session, tool_call_id);
            })
            .await;
        self.emitter.emit_session_changed(snapshot);
        Ok(())
    }

    /// Preload the persisted conversation into the session cache
    pub async fn warm_session(&self, conversation_id: &str) -> AppResult<Arc<AgentSession>> {
        let record = self
            .store
            .fetch_conversation(conversation_id)
            .await
            .map_err(|err| AppError::Store(err.to_string()))?;
        let snapshot = self
            .registry
            .update(conversation_id, |session| {
                session.conversation = Some(record);
            })
            .await;
        self.emitter.emit_session_changed(snapshot.clone());
        Ok(snapshot)
    }

    /// Track which conversation the UI is displaying
    pub async fn set_displayed_conversation(&self, conversation_id: Option<&str>) {
        self.registry.set_displayed(conversation_id).await;
    }

    /// Drop a conversation's session (conversation deletion)
    pub async fn remove_conversation(&self, conversation_id: &str) -> bool {
        self.registry.remove(conversation_id).await
    }

    /// Drop every session (app reset)
    pub async fn reset_all(&self) {
        self.registry.reset().await;
    }
}
