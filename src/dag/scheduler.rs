// src/dag/scheduler.rs

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::dag::graph::DagGraph;
use crate::dag::task::TaskName;
use crate::engine::TaskOutcome;
use crate::errors::{DagrunError, Result};
use crate::run::{RunReport, RunState, TaskStatus};

/// What the scheduler decided after absorbing an event.
///
/// The runtime enqueues `ready` into the dispatch queue and arms a backoff
/// timer for `retry` (if any).
#[derive(Debug, Default)]
pub struct Tick {
    pub ready: Vec<TaskName>,
    pub retry: Option<(TaskName, Duration)>,
}

/// Scheduler: the pure state machine driving one run of a [`DagGraph`].
///
/// It is responsible for:
/// - deciding when a task is "ready" to run (every dependency `Success`)
/// - marking tasks as succeeded/failed/retrying as outcomes arrive
/// - skipping dependents when a task fails
/// - skipping everything non-terminal when the run is cancelled
///
/// It never performs I/O and never blocks; timing (backoff) and dispatch are
/// the runtime's job. That keeps it directly drivable from synchronous
/// tests.
pub struct Scheduler {
    graph: DagGraph,
    state: RunState,
}

impl Scheduler {
    pub fn new(graph: DagGraph, state: RunState) -> Self {
        Self { graph, state }
    }

    /// Begin (or resume) the run. Returns every task that can be dispatched
    /// right away.
    ///
    /// Fails with [`DagrunError::SchedulerFatal`] if the state claims a task
    /// is still `Running`: completions for it could never arrive, so the
    /// state is corrupted from this scheduler's point of view.
    pub fn start(&mut self) -> Result<Vec<TaskName>> {
        if let Some(stuck) = self
            .graph
            .task_names()
            .find(|name| self.state.status_of(name) == Some(TaskStatus::Running))
        {
            return Err(DagrunError::SchedulerFatal(format!(
                "cannot start run {}: task '{}' is marked running",
                self.state.run_id(),
                stuck
            )));
        }

        // A Pending task behind a failed or skipped dependency can never be
        // promoted: no completion event will ever arrive for it, so the run
        // would hang. A consistent snapshot has such tasks marked Skipped.
        for name in self.state.pending_tasks() {
            if let Some(dep) = self.graph.dependencies_of(&name).iter().find(|dep| {
                matches!(
                    self.state.status_of(dep),
                    Some(status) if status.is_terminal() && status != TaskStatus::Success
                )
            }) {
                return Err(DagrunError::SchedulerFatal(format!(
                    "cannot start run {}: task '{}' is pending but its dependency '{}' \
                     can no longer succeed",
                    self.state.run_id(),
                    name,
                    dep
                )));
            }
        }

        if self.state.is_cancelled() {
            debug!(run_id = self.state.run_id(), "run is cancelled; nothing to start");
            return Ok(Vec::new());
        }

        info!(
            run_id = self.state.run_id(),
            tasks = self.graph.len(),
            "scheduler: starting run"
        );

        // Tasks already Ready or Retrying (e.g. from a resumed mid-run
        // snapshot) go back into the dispatch queue alongside the newly
        // promoted ones; a backoff timer from a previous runtime no longer
        // exists, so Retrying tasks are re-dispatched immediately.
        let resumable: Vec<TaskName> = self
            .graph
            .task_names()
            .filter(|name| {
                matches!(
                    self.state.status_of(name),
                    Some(TaskStatus::Ready) | Some(TaskStatus::Retrying)
                )
            })
            .map(|name| name.to_string())
            .collect();

        let mut ready = resumable;
        for name in &ready {
            self.state.set_status(name, TaskStatus::Ready);
        }
        ready.extend(self.promote_ready());
        Ok(ready)
    }

    /// Record that the runtime handed a task to the executor.
    ///
    /// Returns the attempt number (1-based) for logging and diagnostics, or
    /// `None` if the task is no longer `Ready` (e.g. it was skipped while
    /// waiting in the dispatch queue) and must not be dispatched.
    pub fn mark_dispatched(&mut self, task: &str) -> Option<u32> {
        if self.state.status_of(task) != Some(TaskStatus::Ready) {
            debug!(task = %task, "task left Ready state while queued; not dispatching");
            return None;
        }

        self.state.set_status(task, TaskStatus::Running);
        let attempt = self.state.record_attempt(task);
        debug!(task = %task, attempt, "task dispatched");
        Some(attempt)
    }

    /// Absorb the outcome of a finished task.
    ///
    /// - `Success`: mark it and promote dependents whose dependencies are
    ///   now satisfied.
    /// - `Failed`: mark it and skip all transitive dependents.
    /// - `Transient`: retry with backoff if the task has a policy with
    ///   attempts remaining, otherwise treat as failed.
    pub fn on_task_finished(&mut self, task: &str, outcome: TaskOutcome) -> Result<Tick> {
        let status = match self.state.status_of(task) {
            Some(s) => s,
            None => {
                return Err(DagrunError::SchedulerFatal(format!(
                    "completion event for unknown task '{task}'"
                )));
            }
        };

        if self.state.is_cancelled() {
            // In-flight tasks were already marked Skipped at cancellation;
            // their late completions are expected and ignored.
            debug!(task = %task, ?outcome, "ignoring completion after cancellation");
            return Ok(Tick::default());
        }

        if status != TaskStatus::Running {
            return Err(DagrunError::SchedulerFatal(format!(
                "completion event for task '{task}' in status {status:?}"
            )));
        }

        let mut tick = Tick::default();

        match outcome {
            TaskOutcome::Success => {
                self.state.set_status(task, TaskStatus::Success);
                info!(task = %task, "task completed successfully");
                tick.ready = self.promote_ready();
            }
            TaskOutcome::Failed(error) => {
                warn!(task = %task, error = %error, "task failed; skipping dependents");
                self.fail_and_skip(task);
            }
            TaskOutcome::Transient(error) => {
                let attempts = self.state.attempts_of(task);
                let policy = self.graph.task(task).and_then(|def| def.retry.clone());

                match policy {
                    Some(policy) if attempts <= policy.max_retries => {
                        let delay = policy.backoff_delay(attempts);
                        warn!(
                            task = %task,
                            error = %error,
                            attempt = attempts,
                            max_retries = policy.max_retries,
                            delay_ms = delay.as_millis() as u64,
                            "transient failure; retrying after backoff"
                        );
                        self.state.set_status(task, TaskStatus::Retrying);
                        tick.retry = Some((task.to_string(), delay));
                    }
                    _ => {
                        warn!(
                            task = %task,
                            error = %error,
                            attempts,
                            "transient failure with no retries left; marking failed"
                        );
                        self.fail_and_skip(task);
                    }
                }
            }
        }

        Ok(tick)
    }

    /// A backoff timer fired: the task may be dispatched again.
    pub fn on_retry_due(&mut self, task: &str) -> Vec<TaskName> {
        if self.state.is_cancelled() {
            debug!(task = %task, "retry due after cancellation; ignoring");
            return Vec::new();
        }

        match self.state.status_of(task) {
            Some(TaskStatus::Retrying) => {
                self.state.set_status(task, TaskStatus::Ready);
                vec![task.to_string()]
            }
            other => {
                // The task may have been skipped while waiting for backoff.
                debug!(task = %task, status = ?other, "retry due but task no longer retrying");
                Vec::new()
            }
        }
    }

    /// Cancel the run: every non-terminal task becomes `Skipped` and nothing
    /// further will be promoted or dispatched.
    pub fn cancel(&mut self) {
        info!(run_id = self.state.run_id(), "run cancelled");
        self.state.mark_cancelled();
    }

    pub fn is_complete(&self) -> bool {
        self.state.is_complete()
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    pub fn graph(&self) -> &DagGraph {
        &self.graph
    }

    pub fn report(&self) -> RunReport {
        self.state.report()
    }

    /// Mark the task `Failed` and all its transitive non-terminal dependents
    /// `Skipped`.
    fn fail_and_skip(&mut self, task: &str) {
        self.state.set_status(task, TaskStatus::Failed);

        let mut stack: Vec<TaskName> = self.graph.dependents_of(task).to_vec();

        while let Some(name) = stack.pop() {
            match self.state.status_of(&name) {
                Some(status) if !status.is_terminal() => {
                    self.state.set_status(&name, TaskStatus::Skipped);
                    debug!(
                        task = %name,
                        "skipping dependent due to upstream failure"
                    );
                    stack.extend(self.graph.dependents_of(&name).iter().cloned());
                }
                _ => {
                    // Already terminal (possibly skipped via another path).
                }
            }
        }
    }

    /// Collect tasks that are `Pending` and whose dependencies are all
    /// `Success`, mark them `Ready`, and return them in deterministic order.
    fn promote_ready(&mut self) -> Vec<TaskName> {
        let candidates: Vec<TaskName> = self
            .state
            .pending_tasks()
            .into_iter()
            .filter(|name| self.deps_satisfied(name))
            .collect();

        for name in &candidates {
            debug!(task = %name, "dependencies satisfied; marking Ready");
            self.state.set_status(name, TaskStatus::Ready);
        }

        candidates
    }

    /// A task may run only when every dependency reached `Success`.
    fn deps_satisfied(&self, task: &str) -> bool {
        self.graph
            .dependencies_of(task)
            .iter()
            .all(|dep| self.state.status_of(dep) == Some(TaskStatus::Success))
    }
}
