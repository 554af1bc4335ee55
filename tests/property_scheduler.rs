//! Property tests for the scheduler state machine over generated DAGs.

use std::collections::{HashSet, VecDeque};

use proptest::prelude::*;

use dagrun::{GraphBuilder, RunState, Scheduler, TaskDef, TaskOutcome, TaskStatus};
use dagrun_test_utils::ok_work;

/// Generate an acyclic dependency spec: task N may only depend on tasks
/// 0..N-1, which guarantees acyclicity by construction.
fn dag_spec_strategy(max_tasks: usize) -> impl Strategy<Value = Vec<Vec<usize>>> {
    (1..=max_tasks).prop_flat_map(|num_tasks| {
        proptest::collection::vec(
            proptest::collection::vec(any::<usize>(), 0..num_tasks),
            num_tasks,
        )
        .prop_map(move |raw| {
            raw.into_iter()
                .enumerate()
                .map(|(i, potential)| {
                    let mut deps: Vec<usize> = potential
                        .into_iter()
                        .filter(|_| i > 0)
                        .map(|d| d % i.max(1))
                        .collect::<HashSet<_>>()
                        .into_iter()
                        .collect();
                    deps.sort_unstable();
                    deps
                })
                .collect()
        })
    })
}

fn task_name(i: usize) -> String {
    format!("task_{i}")
}

fn build_scheduler(spec: &[Vec<usize>]) -> Scheduler {
    let mut builder = GraphBuilder::new();
    for i in 0..spec.len() {
        builder
            .add_task(TaskDef::new(task_name(i), ok_work()))
            .unwrap();
    }
    for (i, deps) in spec.iter().enumerate() {
        for dep in deps {
            builder.add_edge(task_name(*dep), task_name(i)).unwrap();
        }
    }
    let graph = builder.build().unwrap();
    let state = RunState::new(1, &graph);
    Scheduler::new(graph, state)
}

proptest! {
    /// Drive any generated DAG to completion with a mix of failures and
    /// check the core invariants:
    /// - the run terminates with every task terminal
    /// - a task was dispatched iff all its dependencies succeeded
    /// - tasks downstream of a failure end up skipped, never run
    #[test]
    fn scheduler_terminates_and_respects_dependencies(
        spec in dag_spec_strategy(10),
        failing in proptest::collection::hash_set(0..10usize, 0..4),
    ) {
        let mut scheduler = build_scheduler(&spec);
        let mut queue: VecDeque<String> = scheduler.start().unwrap().into();
        let mut dispatched: Vec<String> = Vec::new();

        while let Some(task) = queue.pop_front() {
            prop_assert_eq!(scheduler.mark_dispatched(&task), Some(1));
            dispatched.push(task.clone());

            let idx: usize = task
                .strip_prefix("task_")
                .unwrap()
                .parse()
                .unwrap();
            let outcome = if failing.contains(&idx) {
                TaskOutcome::Failed("injected failure".into())
            } else {
                TaskOutcome::Success
            };

            let tick = scheduler.on_task_finished(&task, outcome).unwrap();
            prop_assert!(tick.retry.is_none());
            queue.extend(tick.ready);
        }

        prop_assert!(scheduler.is_complete());

        let state = scheduler.state();
        for (i, deps) in spec.iter().enumerate() {
            let name = task_name(i);
            let status = state.status_of(&name).unwrap();
            let deps_succeeded = deps
                .iter()
                .all(|d| state.status_of(&task_name(*d)) == Some(TaskStatus::Success));

            // Dispatched iff every dependency succeeded.
            prop_assert_eq!(dispatched.contains(&name), deps_succeeded);

            let expected = if !deps_succeeded {
                TaskStatus::Skipped
            } else if failing.contains(&i) {
                TaskStatus::Failed
            } else {
                TaskStatus::Success
            };
            prop_assert_eq!(status, expected);
        }
    }
}
