// src/logging.rs

//! Logging setup for `dagrun` using `tracing` + `tracing-subscriber`.
//!
//! Priority for determining the log filter:
//! 1. explicit level passed by the caller (if provided)
//! 2. `DAGRUN_LOG` environment variable (e.g. "info", "dagrun=debug")
//! 3. default to `info`

use anyhow::Result;
use tracing_subscriber::{fmt, EnvFilter};

/// Initialise the global logging subscriber.
///
/// Safe to call once at startup (a second call will panic; embedders that
/// already installed a subscriber should simply not call this).
pub fn init_logging(level: Option<tracing::Level>) -> Result<()> {
    let filter = match level {
        Some(lvl) => EnvFilter::new(lvl.to_string()),
        None => EnvFilter::try_from_env("DAGRUN_LOG")
            .unwrap_or_else(|_| EnvFilter::new("info")),
    };

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .init();

    Ok(())
}
