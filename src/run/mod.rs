// src/run/mod.rs

//! Per-run state tracking: one status per task, attempt counters, and the
//! serializable [`RunReport`] snapshot handed back when a run finishes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dag::{DagGraph, TaskName};

/// Status of a single task within one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Participating in the run but waiting on dependencies.
    Pending,
    /// Dependencies satisfied; waiting in the dispatch queue.
    Ready,
    /// Handed to the executor and currently executing.
    Running,
    /// Transient failure observed; waiting for the backoff timer.
    Retrying,
    /// Terminal: completed successfully.
    Success,
    /// Terminal: failed (permanently, or retries exhausted).
    Failed,
    /// Terminal: never ran because an upstream task failed or the run was
    /// cancelled.
    Skipped,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskStatus::Success | TaskStatus::Failed | TaskStatus::Skipped
        )
    }
}

/// Overall status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

/// Mutable state of one run: a status and an attempt counter per task.
///
/// Mutated only by the scheduler (single logical writer); the runtime and
/// executor never touch statuses directly. Once every task is terminal the
/// runtime stops driving it, so the state is effectively immutable from then
/// on.
#[derive(Debug, Clone)]
pub struct RunState {
    run_id: u64,
    statuses: BTreeMap<TaskName, TaskStatus>,
    attempts: BTreeMap<TaskName, u32>,
    cancelled: bool,
}

impl RunState {
    /// Fresh state for a new run: every task starts `Pending` with zero
    /// attempts.
    pub fn new(run_id: u64, graph: &DagGraph) -> Self {
        let statuses = graph
            .task_names()
            .map(|name| (name.to_string(), TaskStatus::Pending))
            .collect();
        let attempts = graph
            .task_names()
            .map(|name| (name.to_string(), 0))
            .collect();

        Self {
            run_id,
            statuses,
            attempts,
            cancelled: false,
        }
    }

    /// Rebuild state from a previously captured report, e.g. to resume a run
    /// or to re-drive a terminal one (which must be a no-op).
    pub fn from_report(report: &RunReport) -> Self {
        Self {
            run_id: report.run_id,
            statuses: report.tasks.clone(),
            attempts: report.attempts.clone(),
            cancelled: report.status == RunStatus::Cancelled,
        }
    }

    pub fn run_id(&self) -> u64 {
        self.run_id
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    pub fn status_of(&self, task: &str) -> Option<TaskStatus> {
        self.statuses.get(task).copied()
    }

    pub fn attempts_of(&self, task: &str) -> u32 {
        self.attempts.get(task).copied().unwrap_or(0)
    }

    /// All tasks terminal?
    pub fn is_complete(&self) -> bool {
        self.statuses.values().all(|s| s.is_terminal())
    }

    /// Number of tasks currently in `Running` status.
    pub fn running_count(&self) -> usize {
        self.statuses
            .values()
            .filter(|s| matches!(s, TaskStatus::Running))
            .count()
    }

    pub(crate) fn set_status(&mut self, task: &str, status: TaskStatus) {
        if let Some(slot) = self.statuses.get_mut(task) {
            debug!(
                run_id = self.run_id,
                task = %task,
                from = ?*slot,
                to = ?status,
                "task status transition"
            );
            *slot = status;
        }
    }

    /// Record a dispatch; returns the attempt number (1-based).
    pub(crate) fn record_attempt(&mut self, task: &str) -> u32 {
        let counter = self.attempts.entry(task.to_string()).or_insert(0);
        *counter += 1;
        *counter
    }

    /// Cancel the run: every non-terminal task becomes `Skipped`.
    pub(crate) fn mark_cancelled(&mut self) {
        self.cancelled = true;
        for (task, status) in self.statuses.iter_mut() {
            if !status.is_terminal() {
                debug!(
                    run_id = self.run_id,
                    task = %task,
                    from = ?*status,
                    "run cancelled; skipping task"
                );
                *status = TaskStatus::Skipped;
            }
        }
    }

    /// Tasks currently in `Pending` status, in deterministic order.
    pub(crate) fn pending_tasks(&self) -> Vec<TaskName> {
        self.statuses
            .iter()
            .filter(|(_, s)| matches!(s, TaskStatus::Pending))
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Snapshot the state into a serializable report.
    pub fn report(&self) -> RunReport {
        let status = if self.cancelled {
            RunStatus::Cancelled
        } else if !self.is_complete() {
            RunStatus::Running
        } else if self
            .statuses
            .values()
            .any(|s| matches!(s, TaskStatus::Failed))
        {
            RunStatus::Failed
        } else {
            RunStatus::Succeeded
        };

        RunReport {
            run_id: self.run_id,
            status,
            tasks: self.statuses.clone(),
            attempts: self.attempts.clone(),
        }
    }
}

/// Immutable snapshot of a run, suitable for logging or persistence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: u64,
    pub status: RunStatus,
    pub tasks: BTreeMap<TaskName, TaskStatus>,
    pub attempts: BTreeMap<TaskName, u32>,
}
