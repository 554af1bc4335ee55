//! Graph and work builders for tests.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dagrun::{work_fn, DagGraph, GraphBuilder, TaskDef, Work, WorkError};

/// Work that immediately succeeds.
pub fn ok_work() -> Arc<dyn Work> {
    work_fn(|| async { Ok(()) })
}

/// Work that immediately fails permanently.
pub fn fail_work(msg: &str) -> Arc<dyn Work> {
    let msg = msg.to_string();
    work_fn(move || {
        let msg = msg.clone();
        async move { Err(WorkError::Permanent(msg)) }
    })
}

/// Work that always fails transiently.
pub fn transient_work(msg: &str) -> Arc<dyn Work> {
    let msg = msg.to_string();
    work_fn(move || {
        let msg = msg.clone();
        async move { Err(WorkError::Transient(msg)) }
    })
}

/// Work that fails transiently for the first `fail_times` invocations, then
/// succeeds.
pub fn flaky_work(fail_times: u32) -> Arc<dyn Work> {
    let calls = Arc::new(AtomicU32::new(0));
    work_fn(move || {
        let calls = Arc::clone(&calls);
        async move {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            if n < fail_times {
                Err(WorkError::Transient(format!("flaky failure #{}", n + 1)))
            } else {
                Ok(())
            }
        }
    })
}

/// Work that sleeps for the given duration, then succeeds.
pub fn sleep_work(duration: Duration) -> Arc<dyn Work> {
    work_fn(move || async move {
        tokio::time::sleep(duration).await;
        Ok(())
    })
}

/// Build a graph where every task uses [`ok_work`].
///
/// Each entry is `(task, deps)`: an edge `dep -> task` is added for every
/// listed dependency.
pub fn graph(tasks: &[(&str, &[&str])]) -> DagGraph {
    let specs: Vec<(&str, Arc<dyn Work>, Vec<&str>)> = tasks
        .iter()
        .map(|(name, deps)| (*name, ok_work(), deps.to_vec()))
        .collect();
    graph_with(specs)
}

/// Build a graph with explicit work per task.
///
/// Panics on invalid specs; tests construct only valid graphs here and use
/// [`GraphBuilder`] directly when exercising validation errors.
pub fn graph_with(tasks: Vec<(&str, Arc<dyn Work>, Vec<&str>)>) -> DagGraph {
    let mut builder = GraphBuilder::new();

    for (name, work, _) in &tasks {
        builder
            .add_task(TaskDef::new(*name, Arc::clone(work)))
            .expect("duplicate task in test graph spec");
    }
    for (name, _, deps) in &tasks {
        for dep in deps {
            builder
                .add_edge(*dep, *name)
                .expect("invalid edge in test graph spec");
        }
    }

    builder.build().expect("test graph spec must be acyclic")
}
