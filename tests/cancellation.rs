//! Cancellation: all non-terminal tasks become skipped and nothing further
//! is dispatched.

use std::error::Error;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dagrun::{
    work_fn, GraphBuilder, LocalExecutor, Runtime, RuntimeOptions, RunStatus, TaskDef, Work,
};
use dagrun_test_utils::sleep_work;

type TestResult = Result<(), Box<dyn Error>>;

/// Work that records whether it ever started.
fn tracked_work(started: Arc<AtomicBool>) -> Arc<dyn Work> {
    work_fn(move || {
        let started = Arc::clone(&started);
        async move {
            started.store(true, Ordering::SeqCst);
            Ok(())
        }
    })
}

#[tokio::test]
async fn cancel_mid_run_skips_pending_and_in_flight_tasks() -> TestResult {
    let b_started = Arc::new(AtomicBool::new(false));

    let mut builder = GraphBuilder::new();
    builder.add_task(TaskDef::new("A", sleep_work(Duration::from_millis(50))))?;
    builder.add_task(TaskDef::new("B", tracked_work(Arc::clone(&b_started))))?;
    builder.add_edge("A", "B")?;
    let graph = builder.build()?;

    let runtime = Runtime::new(graph, RuntimeOptions::default());
    let backend = LocalExecutor::new(runtime.event_sender());
    let handle = runtime.handle();

    let cancel = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        handle.cancel().await;
    });

    let report = runtime.run(backend).await?;
    cancel.await?;

    assert_eq!(report.status, RunStatus::Cancelled);
    assert!(report
        .tasks
        .values()
        .all(|s| *s == dagrun::TaskStatus::Skipped));
    assert!(
        !b_started.load(Ordering::SeqCst),
        "B must never be dispatched after cancellation"
    );
    Ok(())
}

#[tokio::test]
async fn cancel_queued_before_run_still_drains_in_flight_roots() -> TestResult {
    // Roots are dispatched before the first event is processed, so a cancel
    // queued ahead of the run skips everything but still waits for the
    // in-flight root to drain.
    let mut builder = GraphBuilder::new();
    builder.add_task(TaskDef::new("A", sleep_work(Duration::from_millis(30))))?;
    builder.add_task(TaskDef::new("B", sleep_work(Duration::from_millis(1))))?;
    builder.add_task(TaskDef::new("C", sleep_work(Duration::from_millis(1))))?;
    builder.add_edge("A", "B")?;
    builder.add_edge("B", "C")?;
    let graph = builder.build()?;

    let runtime = Runtime::new(graph, RuntimeOptions::default());
    let backend = LocalExecutor::new(runtime.event_sender());
    let handle = runtime.handle();

    handle.cancel().await;
    let report = runtime.run(backend).await?;

    assert_eq!(report.status, RunStatus::Cancelled);
    Ok(())
}

#[tokio::test]
async fn cancel_after_completion_is_a_noop() -> TestResult {
    let mut builder = GraphBuilder::new();
    builder.add_task(TaskDef::new("A", sleep_work(Duration::from_millis(1))))?;
    let graph = builder.build()?;

    let runtime = Runtime::new(graph, RuntimeOptions::default());
    let backend = LocalExecutor::new(runtime.event_sender());
    let handle = runtime.handle();

    let report = runtime.run(backend).await?;
    assert_eq!(report.status, RunStatus::Succeeded);

    // The runtime is gone; cancelling the handle must not panic or hang.
    handle.cancel().await;
    Ok(())
}
