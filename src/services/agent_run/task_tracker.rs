//! Cross-Cutting Task Tracker
//!
//! Tracks background tasks correlated by run id, outside the session state.
//! When a run reaches a terminal outcome, every task registered under that
//! run is finalized with the run's reason, whether or not the session's
//! reconciliation succeeded.

use dashmap::DashMap;

use sceneloom_core::{RunId, TerminalReason};

/// One tracked background task
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedTask {
    pub id: String,
    pub label: String,
    pub finished: bool,
    pub outcome: Option<TerminalReason>,
    /// Timestamp (RFC 3339), set on finalization
    pub finished_at: Option<String>,
}

/// Run-keyed task registry
pub struct TaskTracker {
    tasks: DashMap<RunId, Vec<TrackedTask>>,
}

impl TaskTracker {
    pub fn new() -> Self {
        Self {
            tasks: DashMap::new(),
        }
    }

    /// Register a task under a run
    pub fn register_task(&self, run_id: &str, task_id: impl Into<String>, label: impl Into<String>) {
        self.tasks
            .entry(run_id.to_string())
            .or_default()
            .push(TrackedTask {
                id: task_id.into(),
                label: label.into(),
                finished: false,
                outcome: None,
                finished_at: None,
            });
    }

    /// Finalize every unfinished task for a run; returns how many were closed
    pub fn finalize_run(&self, run_id: &str, reason: TerminalReason) -> usize {
        let Some(mut entry) = self.tasks.get_mut(run_id) else {
            return 0;
        };
        let now = chrono::Utc::now().to_rfc3339();
        let mut closed = 0;
        for task in entry.iter_mut() {
            if !task.finished {
                task.finished = true;
                task.outcome = Some(reason);
                task.finished_at = Some(now.clone());
                closed += 1;
            }
        }
        if closed > 0 {
            tracing::debug!(run_id = %run_id, closed, reason = ?reason, "finalized run tasks");
        }
        closed
    }

    /// Snapshot of the tasks registered under a run
    pub fn tasks_for_run(&self, run_id: &str) -> Vec<TrackedTask> {
        self.tasks
            .get(run_id)
            .map(|entry| entry.clone())
            .unwrap_or_default()
    }

    /// Drop a run's entry entirely
    pub fn clear_run(&self, run_id: &str) {
        self.tasks.remove(run_id);
    }
}

impl Default for TaskTracker {
    fn default() -> Self {
        Self::new()
    }
}
