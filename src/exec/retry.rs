// src/exec/retry.rs

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Bounded retry with exponential backoff for transient task failures.
///
/// Attempt `n` (1-based) that fails transiently is retried after
/// `base_delay * multiplier^(n-1)`, capped at `max_delay`, until
/// `max_retries` retries have been spent. A task therefore runs at most
/// `1 + max_retries` times.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Policy with the given retry bound and default backoff parameters.
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Self::default()
        }
    }

    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// Delay before re-dispatching after the given failed attempt (1-based).
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let attempt = attempt.max(1);
        // Non-positive multipliers would make the backoff collapse; treat
        // them as "no growth".
        let multiplier = if self.multiplier > 0.0 {
            self.multiplier
        } else {
            1.0
        };

        // Cap in f64 space: the uncapped product overflows Duration's range
        // for large attempt numbers, and high attempts are reachable once
        // sleeps are capped at max_delay.
        let backoff = self.base_delay.as_secs_f64() * multiplier.powi(attempt as i32 - 1);
        let capped = self.max_delay.as_secs_f64();
        if !backoff.is_finite() || backoff >= capped {
            return self.max_delay;
        }

        Duration::from_secs_f64(backoff)
    }
}
