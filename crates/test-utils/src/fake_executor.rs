use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use dagrun::errors::Result;
use dagrun::{DispatchedTask, ExecutorBackend, RuntimeEvent, TaskOutcome};

/// A fake executor that:
/// - records which tasks were dispatched (in order, with attempt numbers)
/// - immediately reports a scripted outcome for each dispatch
///   (default: `TaskOutcome::Success`).
pub struct FakeExecutor {
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    executed: Arc<Mutex<Vec<(String, u32)>>>,
    outcomes: Arc<Mutex<HashMap<String, VecDeque<TaskOutcome>>>>,
}

impl FakeExecutor {
    pub fn new(runtime_tx: mpsc::Sender<RuntimeEvent>) -> Self {
        Self {
            runtime_tx,
            executed: Arc::new(Mutex::new(Vec::new())),
            outcomes: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Script the outcome for the next dispatch of `task`. Multiple pushes
    /// queue up; once exhausted, dispatches succeed.
    pub fn push_outcome(&self, task: &str, outcome: TaskOutcome) {
        self.outcomes
            .lock()
            .unwrap()
            .entry(task.to_string())
            .or_default()
            .push_back(outcome);
    }

    /// Shared view of dispatched `(task, attempt)` pairs.
    pub fn executed(&self) -> Arc<Mutex<Vec<(String, u32)>>> {
        Arc::clone(&self.executed)
    }

    /// Dispatched task names, in dispatch order.
    pub fn executed_names(&self) -> Vec<String> {
        self.executed
            .lock()
            .unwrap()
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }
}

impl ExecutorBackend for FakeExecutor {
    fn dispatch(
        &mut self,
        task: DispatchedTask,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let tx = self.runtime_tx.clone();
        let executed = Arc::clone(&self.executed);
        let outcomes = Arc::clone(&self.outcomes);

        Box::pin(async move {
            {
                let mut guard = executed.lock().unwrap();
                guard.push((task.name.clone(), task.attempt));
            }

            let outcome = {
                let mut guard = outcomes.lock().unwrap();
                guard
                    .get_mut(&task.name)
                    .and_then(|queue| queue.pop_front())
                    .unwrap_or(TaskOutcome::Success)
            };

            tx.send(RuntimeEvent::TaskFinished {
                task: task.name.clone(),
                outcome,
            })
            .await
            .map_err(anyhow::Error::from)?;
            Ok(())
        })
    }
}
