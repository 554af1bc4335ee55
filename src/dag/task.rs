// src/dag/task.rs

//! Task definitions and the executable-unit abstraction.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use thiserror::Error;

use crate::exec::RetryPolicy;

/// Public type alias for task names throughout the crate.
pub type TaskName = String;

/// Error reported by a task's executable unit.
///
/// The distinction matters to the scheduler: `Transient` failures are
/// candidates for retry (subject to the task's [`RetryPolicy`]), while
/// `Permanent` failures immediately mark the task as failed.
#[derive(Error, Debug, Clone)]
pub enum WorkError {
    #[error("transient failure: {0}")]
    Transient(String),

    #[error("{0}")]
    Permanent(String),
}

/// Future returned by [`Work::run`].
pub type WorkFuture = Pin<Box<dyn Future<Output = Result<(), WorkError>> + Send>>;

/// The executable unit of a task.
///
/// Implementations own all side effects (process spawn, network call,
/// polling an external condition). The executor stays substrate-agnostic:
/// it only awaits the returned future and maps the result to an outcome.
///
/// A sensor-style task is just a `Work` whose future polls until an external
/// condition holds (or returns `Transient` so the scheduler re-dispatches it
/// with backoff).
pub trait Work: Send + Sync {
    fn run(&self) -> WorkFuture;
}

/// Adapt an async closure (or any factory of futures) into a [`Work`].
///
/// ```ignore
/// let work = work_fn(|| async { Ok(()) });
/// ```
pub fn work_fn<F, Fut>(f: F) -> Arc<dyn Work>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), WorkError>> + Send + 'static,
{
    struct FnWork<F>(F);

    impl<F, Fut> Work for FnWork<F>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), WorkError>> + Send + 'static,
    {
        fn run(&self) -> WorkFuture {
            Box::pin((self.0)())
        }
    }

    Arc::new(FnWork(f))
}

/// Definition of a single task: a unique name, its executable unit, and an
/// optional retry policy for transient failures.
///
/// `retry: None` means a single attempt; transient failures are then treated
/// like permanent ones.
#[derive(Clone)]
pub struct TaskDef {
    pub name: TaskName,
    pub work: Arc<dyn Work>,
    pub retry: Option<RetryPolicy>,
}

impl TaskDef {
    pub fn new(name: impl Into<TaskName>, work: Arc<dyn Work>) -> Self {
        Self {
            name: name.into(),
            work,
            retry: None,
        }
    }

    /// Attach a retry policy for transient failures.
    pub fn with_retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = Some(policy);
        self
    }
}

impl fmt::Debug for TaskDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskDef")
            .field("name", &self.name)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}
