//! The runtime never lets more than `max_concurrency` tasks run at once.

use std::error::Error;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dagrun::{execute, work_fn, GraphBuilder, RuntimeOptions, RunStatus, TaskDef, Work};

type TestResult = Result<(), Box<dyn Error>>;

/// Work that tracks how many instances of itself run concurrently.
fn gauge_work(current: Arc<AtomicUsize>, max_seen: Arc<AtomicUsize>) -> Arc<dyn Work> {
    work_fn(move || {
        let current = Arc::clone(&current);
        let max_seen = Arc::clone(&max_seen);
        async move {
            let now = current.fetch_add(1, Ordering::SeqCst) + 1;
            max_seen.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            current.fetch_sub(1, Ordering::SeqCst);
            Ok(())
        }
    })
}

#[tokio::test]
async fn independent_tasks_respect_the_bound() -> TestResult {
    let current = Arc::new(AtomicUsize::new(0));
    let max_seen = Arc::new(AtomicUsize::new(0));

    let mut builder = GraphBuilder::new();
    for i in 0..8 {
        builder.add_task(TaskDef::new(
            format!("task_{i}"),
            gauge_work(Arc::clone(&current), Arc::clone(&max_seen)),
        ))?;
    }
    let graph = builder.build()?;

    let report = execute(graph, RuntimeOptions { max_concurrency: 2 }).await?;

    assert_eq!(report.status, RunStatus::Succeeded);
    assert!(
        max_seen.load(Ordering::SeqCst) <= 2,
        "observed {} concurrent tasks with a bound of 2",
        max_seen.load(Ordering::SeqCst)
    );
    Ok(())
}

#[tokio::test]
async fn zero_bound_is_clamped_to_one() -> TestResult {
    let current = Arc::new(AtomicUsize::new(0));
    let max_seen = Arc::new(AtomicUsize::new(0));

    let mut builder = GraphBuilder::new();
    for i in 0..3 {
        builder.add_task(TaskDef::new(
            format!("task_{i}"),
            gauge_work(Arc::clone(&current), Arc::clone(&max_seen)),
        ))?;
    }
    let graph = builder.build()?;

    let report = execute(graph, RuntimeOptions { max_concurrency: 0 }).await?;

    assert_eq!(report.status, RunStatus::Succeeded);
    assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    Ok(())
}

#[tokio::test]
async fn wide_fanout_eventually_runs_every_task() -> TestResult {
    let current = Arc::new(AtomicUsize::new(0));
    let max_seen = Arc::new(AtomicUsize::new(0));

    let mut builder = GraphBuilder::new();
    builder.add_task(TaskDef::new(
        "root",
        gauge_work(Arc::clone(&current), Arc::clone(&max_seen)),
    ))?;
    for i in 0..6 {
        builder.add_task(TaskDef::new(
            format!("leaf_{i}"),
            gauge_work(Arc::clone(&current), Arc::clone(&max_seen)),
        ))?;
        builder.add_edge("root", format!("leaf_{i}"))?;
    }
    let graph = builder.build()?;

    let report = execute(graph, RuntimeOptions { max_concurrency: 3 }).await?;

    assert_eq!(report.status, RunStatus::Succeeded);
    assert_eq!(report.tasks.len(), 7);
    assert!(report.tasks.values().all(|s| *s == dagrun::TaskStatus::Success));
    assert!(max_seen.load(Ordering::SeqCst) <= 3);
    Ok(())
}
