// src/exec/backend.rs

//! Pluggable executor backend abstraction.
//!
//! The runtime talks to an [`ExecutorBackend`] instead of a concrete
//! executor. The backend decides the substrate: [`LocalExecutor`] runs work
//! on spawned tokio tasks; a test backend can record dispatches and emit
//! completions directly; a remote backend could forward tasks over the
//! network. The scheduling core stays the same either way.
//!
//! [`LocalExecutor`]: crate::exec::local::LocalExecutor

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::dag::{TaskName, Work};
use crate::errors::Result;

/// A task as handed to an executor: the work to run plus identifying
/// metadata for reporting the outcome back.
#[derive(Clone)]
pub struct DispatchedTask {
    pub name: TaskName,
    /// 1-based attempt number for this dispatch.
    pub attempt: u32,
    pub run_id: u64,
    pub work: Arc<dyn Work>,
}

impl fmt::Debug for DispatchedTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchedTask")
            .field("name", &self.name)
            .field("attempt", &self.attempt)
            .field("run_id", &self.run_id)
            .finish_non_exhaustive()
    }
}

/// Trait abstracting how dispatched tasks are executed.
///
/// Implementations must not block `dispatch` on the task's completion; the
/// runtime's event loop is the caller, and outcomes come back to it as
/// `RuntimeEvent::TaskFinished` events. The runtime enforces the concurrency
/// bound before calling `dispatch`, so implementations need no pool
/// management of their own.
pub trait ExecutorBackend: Send {
    fn dispatch(
        &mut self,
        task: DispatchedTask,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}
