// src/engine/dispatch.rs

use std::collections::VecDeque;

use tracing::debug;

use crate::dag::TaskName;

/// Concurrency-bounded dispatch queue.
///
/// Ready tasks wait here until an executor slot frees up. The runtime pops
/// tasks only while `running < max_concurrency`, which is what enforces the
/// "never more than N tasks running" bound; saturation simply leaves tasks
/// queued (backpressure).
#[derive(Debug)]
pub struct DispatchQueue {
    max_concurrency: usize,
    running: usize,
    ready: VecDeque<TaskName>,
}

impl DispatchQueue {
    /// Create a queue with the given concurrency bound.
    ///
    /// `max_concurrency` is clamped to at least 1; a zero-width pool could
    /// never dispatch anything.
    pub fn new(max_concurrency: usize) -> Self {
        Self {
            max_concurrency: max_concurrency.max(1),
            running: 0,
            ready: VecDeque::new(),
        }
    }

    /// Queue a ready task for dispatch.
    pub fn enqueue(&mut self, task: TaskName) {
        debug!(task = %task, queued = self.ready.len() + 1, "task queued for dispatch");
        self.ready.push_back(task);
    }

    /// Is there a free executor slot?
    pub fn has_capacity(&self) -> bool {
        self.running < self.max_concurrency
    }

    /// Pop the next queued task. The caller must follow up with
    /// [`note_dispatched`](Self::note_dispatched) once the task is actually
    /// handed to the executor (stale entries are dropped without occupying a
    /// slot).
    pub fn pop_ready(&mut self) -> Option<TaskName> {
        self.ready.pop_front()
    }

    /// Record that a popped task was handed to the executor.
    pub fn note_dispatched(&mut self) {
        self.running += 1;
    }

    /// Record that a dispatched task finished (any outcome).
    pub fn task_finished(&mut self) {
        self.running = self.running.saturating_sub(1);
    }

    /// Drop all queued tasks (used on cancellation). In-flight tasks are
    /// unaffected; their completions still drain through `task_finished`.
    pub fn clear_pending(&mut self) {
        if !self.ready.is_empty() {
            debug!(dropped = self.ready.len(), "clearing pending dispatch queue");
        }
        self.ready.clear();
    }

    /// Number of tasks currently occupying executor slots.
    pub fn running(&self) -> usize {
        self.running
    }

    /// Number of tasks waiting for a slot.
    pub fn queued(&self) -> usize {
        self.ready.len()
    }
}
