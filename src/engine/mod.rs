// src/engine/mod.rs

pub mod dispatch;
pub mod runtime;

pub use dispatch::DispatchQueue;
pub use runtime::{RunHandle, Runtime, RuntimeEvent, RuntimeOptions, TaskOutcome};
