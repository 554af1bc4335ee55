// src/engine/runtime.rs

use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::dag::{DagGraph, Scheduler, TaskName, Tick};
use crate::engine::dispatch::DispatchQueue;
use crate::errors::{DagrunError, Result};
use crate::exec::{DispatchedTask, ExecutorBackend};
use crate::run::{RunReport, RunState};

/// Result of a dispatched task, as reported by the executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Success,
    /// Permanent failure; the task will not be retried.
    Failed(String),
    /// Transient failure; retried if the task has a policy with attempts
    /// remaining.
    Transient(String),
}

/// Events sent into the runtime from executors, retry timers, or external
/// handles.
///
/// - the executor sends `TaskFinished`
/// - backoff timers send `RetryDue`
/// - [`RunHandle::cancel`] sends `CancelRequested`
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    TaskFinished { task: TaskName, outcome: TaskOutcome },
    RetryDue { task: TaskName },
    CancelRequested,
}

/// Options that influence how the runtime behaves.
#[derive(Debug, Clone)]
pub struct RuntimeOptions {
    /// Maximum number of tasks in `Running` status at once.
    pub max_concurrency: usize,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self { max_concurrency: 4 }
    }
}

/// Handle for signalling a running [`Runtime`] from outside.
#[derive(Debug, Clone)]
pub struct RunHandle {
    tx: mpsc::Sender<RuntimeEvent>,
}

impl RunHandle {
    /// Cancel the run: all non-terminal tasks become skipped and nothing
    /// further is dispatched. A no-op if the run already finished.
    pub async fn cancel(&self) {
        let _ = self.tx.send(RuntimeEvent::CancelRequested).await;
    }
}

static NEXT_RUN_ID: AtomicU64 = AtomicU64::new(1);

/// The coordinating loop for one run.
///
/// Responsibilities:
/// - consume `RuntimeEvent`s from the executor, retry timers, and handles
/// - drive the [`Scheduler`] state machine
/// - hand ready tasks to the executor through the concurrency-bounded
///   [`DispatchQueue`]
/// - arm backoff timers for retrying tasks
///
/// All task statuses are mutated on this single loop; executors only report
/// outcomes as events, so there is one logical writer per task.
pub struct Runtime {
    scheduler: Scheduler,
    queue: DispatchQueue,

    /// Unified event stream from all producers.
    events_rx: mpsc::Receiver<RuntimeEvent>,
    /// Kept for retry timers; clones are handed to executors and handles.
    events_tx: mpsc::Sender<RuntimeEvent>,
}

impl Runtime {
    /// Runtime for a fresh run of the graph.
    pub fn new(graph: DagGraph, options: RuntimeOptions) -> Self {
        let run_id = NEXT_RUN_ID.fetch_add(1, Ordering::Relaxed);
        let state = RunState::new(run_id, &graph);
        Self::with_state(graph, state, options)
    }

    /// Runtime resuming an existing run state (e.g. rebuilt from a
    /// [`RunReport`]). Driving a state whose tasks are all terminal returns
    /// the identical report without dispatching anything.
    pub fn with_state(graph: DagGraph, state: RunState, options: RuntimeOptions) -> Self {
        let (events_tx, events_rx) = mpsc::channel::<RuntimeEvent>(64);
        Self {
            scheduler: Scheduler::new(graph, state),
            queue: DispatchQueue::new(options.max_concurrency),
            events_rx,
            events_tx,
        }
    }

    /// Sender executors use to report outcomes back into the loop.
    pub fn event_sender(&self) -> mpsc::Sender<RuntimeEvent> {
        self.events_tx.clone()
    }

    /// External handle for cancellation.
    pub fn handle(&self) -> RunHandle {
        RunHandle {
            tx: self.events_tx.clone(),
        }
    }

    /// Drive the run to completion and return its final report.
    pub async fn run<B: ExecutorBackend>(mut self, mut backend: B) -> Result<RunReport> {
        let run_id = self.scheduler.state().run_id();
        info!(run_id, "dagrun runtime started");

        let ready = self.scheduler.start()?;
        self.enqueue(ready);
        self.dispatch(&mut backend).await?;

        while !self.run_finished() {
            let event = match self.events_rx.recv().await {
                Some(event) => event,
                None => {
                    return Err(DagrunError::SchedulerFatal(
                        "event channel closed before run reached a terminal state".into(),
                    ));
                }
            };
            debug!(run_id, ?event, "runtime received event");

            match event {
                RuntimeEvent::TaskFinished { task, outcome } => {
                    self.queue.task_finished();
                    let tick = self.scheduler.on_task_finished(&task, outcome)?;
                    self.apply_tick(tick);
                    self.dispatch(&mut backend).await?;
                }
                RuntimeEvent::RetryDue { task } => {
                    let ready = self.scheduler.on_retry_due(&task);
                    self.enqueue(ready);
                    self.dispatch(&mut backend).await?;
                }
                RuntimeEvent::CancelRequested => {
                    self.scheduler.cancel();
                    self.queue.clear_pending();
                }
            }
        }

        let report = self.scheduler.report();
        info!(run_id, status = ?report.status, "run finished");
        Ok(report)
    }

    /// The run is finished when every task is terminal and no dispatched
    /// task is still draining its completion event.
    fn run_finished(&self) -> bool {
        self.scheduler.is_complete() && self.queue.running() == 0
    }

    fn enqueue(&mut self, ready: Vec<TaskName>) {
        for task in ready {
            self.queue.enqueue(task);
        }
    }

    fn apply_tick(&mut self, tick: Tick) {
        self.enqueue(tick.ready);

        if let Some((task, delay)) = tick.retry {
            let tx = self.events_tx.clone();
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                // Runtime may already be gone; nothing to retry into then.
                let _ = tx.send(RuntimeEvent::RetryDue { task }).await;
            });
        }
    }

    /// Hand queued tasks to the executor while slots are free.
    ///
    /// Tasks that left `Ready` while queued (skipped by an upstream failure
    /// or a cancellation that raced the queue) are dropped here without
    /// occupying a slot.
    async fn dispatch<B: ExecutorBackend>(&mut self, backend: &mut B) -> Result<()> {
        while self.queue.has_capacity() {
            let Some(name) = self.queue.pop_ready() else {
                break;
            };

            let Some(attempt) = self.scheduler.mark_dispatched(&name) else {
                continue;
            };

            let def = self.scheduler.graph().task(&name).ok_or_else(|| {
                DagrunError::SchedulerFatal(format!("queued task '{name}' missing from graph"))
            })?;

            let dispatched = DispatchedTask {
                name: name.clone(),
                attempt,
                run_id: self.scheduler.state().run_id(),
                work: def.work.clone(),
            };

            self.queue.note_dispatched();
            debug!(
                task = %name,
                attempt,
                running = self.queue.running(),
                "dispatching task to executor"
            );

            if let Err(err) = backend.dispatch(dispatched).await {
                warn!(task = %name, error = %err, "executor rejected dispatch");
                return Err(err);
            }
        }
        Ok(())
    }
}
