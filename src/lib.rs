// src/lib.rs

//! dagrun: the scheduling core of a DAG task orchestrator.
//!
//! A [`DagGraph`] holds tasks and dependency edges (always acyclic, enforced
//! by [`GraphBuilder`]). A [`Runtime`] drives one run of a graph: it promotes
//! tasks whose dependencies all succeeded, dispatches them to an
//! [`ExecutorBackend`](exec::ExecutorBackend) under a concurrency bound,
//! retries transient failures with exponential backoff, skips the dependents
//! of failed tasks, and returns a [`RunReport`] once every task is terminal.

pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod run;

pub use crate::dag::{work_fn, DagGraph, GraphBuilder, Scheduler, TaskDef, TaskName, Work, WorkError};
pub use crate::engine::{RunHandle, Runtime, RuntimeEvent, RuntimeOptions, TaskOutcome};
pub use crate::errors::{DagrunError, Result};
pub use crate::exec::{DispatchedTask, ExecutorBackend, LocalExecutor, RetryPolicy};
pub use crate::run::{RunReport, RunState, RunStatus, TaskStatus};

/// Execute one run of the graph on the local executor.
///
/// Convenience wrapper for the common case; use [`Runtime`] directly when a
/// custom backend or a [`RunHandle`] for cancellation is needed.
pub async fn execute(graph: DagGraph, options: RuntimeOptions) -> Result<RunReport> {
    let runtime = Runtime::new(graph, options);
    let backend = LocalExecutor::new(runtime.event_sender());
    runtime.run(backend).await
}

/// Resume a run from a previously captured report on the local executor.
///
/// Resuming a terminal run is idempotent: the identical report comes back
/// and the executor is never invoked.
pub async fn resume(
    graph: DagGraph,
    report: &RunReport,
    options: RuntimeOptions,
) -> Result<RunReport> {
    let state = RunState::from_report(report);
    let runtime = Runtime::with_state(graph, state, options);
    let backend = LocalExecutor::new(runtime.event_sender());
    runtime.run(backend).await
}
