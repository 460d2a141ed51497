//! Reconnect delay policy

use crate::config::BackoffConfig;
use rand::Rng;
use std::time::Duration;

/// Bounded exponential backoff with jitter.
///
/// `next_delay` grows the base delay by `multiplier` per failure up to
/// `max_ms`; `reset` returns to the initial delay after a good connect.
#[derive(Debug, Clone)]
pub struct Backoff {
    config: BackoffConfig,
    attempt: u32,
}

impl Backoff {
    pub fn new(config: BackoffConfig) -> Self {
        Self { config, attempt: 0 }
    }

    /// Number of delays handed out since the last reset
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    /// Un-jittered delay for a given attempt
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let exp = self.config.multiplier.powi(attempt.min(32) as i32);
        let ms = (self.config.initial_ms as f64 * exp).min(self.config.max_ms as f64);
        Duration::from_millis(ms as u64)
    }

    /// Delay before the next reconnect attempt
    pub fn next_delay(&mut self) -> Duration {
        let base = self.base_delay(self.attempt);
        self.attempt = self.attempt.saturating_add(1);
        apply_jitter(base, self.config.jitter, self.config.max_ms)
    }
}

fn apply_jitter(duration: Duration, jitter: f64, max_ms: u64) -> Duration {
    if jitter <= 0.0 {
        return duration;
    }
    let factor = 1.0 + rand::thread_rng().gen_range(-jitter..=jitter);
    let ms = (duration.as_millis() as f64 * factor).clamp(0.0, max_ms as f64);
    Duration::from_millis(ms as u64)
}
