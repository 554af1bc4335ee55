// src/exec/local.rs

use std::future::Future;
use std::pin::Pin;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::dag::WorkError;
use crate::engine::{RuntimeEvent, TaskOutcome};
use crate::errors::Result;
use crate::exec::backend::{DispatchedTask, ExecutorBackend};

/// Executor backend running each task on its own tokio task.
///
/// The work runs on a nested spawn so a panicking task body is isolated and
/// reported as a permanent failure instead of taking the executor down.
pub struct LocalExecutor {
    runtime_tx: mpsc::Sender<RuntimeEvent>,
}

impl LocalExecutor {
    /// Create a local executor wired to the given runtime event sender.
    pub fn new(runtime_tx: mpsc::Sender<RuntimeEvent>) -> Self {
        Self { runtime_tx }
    }
}

impl ExecutorBackend for LocalExecutor {
    fn dispatch(
        &mut self,
        task: DispatchedTask,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let runtime_tx = self.runtime_tx.clone();

        Box::pin(async move {
            tokio::spawn(run_task(task, runtime_tx));
            Ok(())
        })
    }
}

/// Run a single task's work to completion and report the outcome as a
/// `TaskFinished` event.
async fn run_task(task: DispatchedTask, runtime_tx: mpsc::Sender<RuntimeEvent>) {
    info!(
        task = %task.name,
        run_id = task.run_id,
        attempt = task.attempt,
        "starting task"
    );

    let work = task.work.clone();
    let handle = tokio::spawn(async move { work.run().await });

    let outcome = match handle.await {
        Ok(Ok(())) => TaskOutcome::Success,
        Ok(Err(WorkError::Transient(msg))) => TaskOutcome::Transient(msg),
        Ok(Err(WorkError::Permanent(msg))) => TaskOutcome::Failed(msg),
        Err(join_err) if join_err.is_panic() => {
            warn!(task = %task.name, "task body panicked");
            TaskOutcome::Failed("task panicked".to_string())
        }
        Err(join_err) => TaskOutcome::Failed(format!("task aborted: {join_err}")),
    };

    debug!(task = %task.name, ?outcome, "task finished");

    if runtime_tx
        .send(RuntimeEvent::TaskFinished {
            task: task.name.clone(),
            outcome,
        })
        .await
        .is_err()
    {
        // Runtime already exited (e.g. fatal error); the outcome has nowhere
        // to go.
        warn!(task = %task.name, "runtime gone; dropping task outcome");
    }
}
