// src/errors.rs

//! Crate-wide error type and `Result` alias.

use thiserror::Error;

use crate::dag::TaskName;

#[derive(Error, Debug)]
pub enum DagrunError {
    #[error("unknown task '{0}' referenced by a dependency edge")]
    UnknownTask(TaskName),

    #[error("task '{0}' is already defined in this graph")]
    DuplicateTask(TaskName),

    #[error("cycle detected in task graph involving task '{0}'")]
    DependencyCycle(TaskName),

    #[error("scheduler state corrupted: {0}")]
    SchedulerFatal(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, DagrunError>;
