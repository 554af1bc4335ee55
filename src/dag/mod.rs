// src/dag/mod.rs

pub mod graph;
pub mod scheduler;
pub mod task;

pub use graph::{DagGraph, GraphBuilder};
pub use scheduler::{Scheduler, Tick};
pub use task::{work_fn, TaskDef, TaskName, Work, WorkError, WorkFuture};
