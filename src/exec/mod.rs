// src/exec/mod.rs

pub mod backend;
pub mod local;
pub mod retry;

pub use backend::{DispatchedTask, ExecutorBackend};
pub use local::LocalExecutor;
pub use retry::RetryPolicy;
