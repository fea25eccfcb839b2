//! Exponential backoff between consecutive failed status polls.
//!
//! Only used after a transient failure. The steady-state cadence between
//! successful polls is
//! [`MonitorConfig::poll_interval`](crate::config::MonitorConfig::poll_interval)
//! and does not grow.

use std::time::Duration;

/// Tunable parameters for the exponential-backoff strategy.
#[derive(Debug, Clone)]
pub struct BackoffPolicy {
    /// Delay before the first retry.
    pub base: Duration,
    /// Upper bound on any single delay.
    pub max: Duration,
    /// Factor by which the delay grows per attempt.
    pub multiplier: f64,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base: Duration::from_secs(1),
            max: Duration::from_secs(10),
            multiplier: 2.0,
        }
    }
}

impl BackoffPolicy {
    /// Delay before retry number `attempt` (0 for the first retry).
    ///
    /// The result is clamped to [`max`](Self::max).
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.powi(attempt.min(i32::MAX as u32) as i32);
        let millis = self.base.as_millis() as f64 * factor;
        if !millis.is_finite() || millis >= self.max.as_millis() as f64 {
            return self.max;
        }
        Duration::from_millis(millis as u64).min(self.max)
    }
}
