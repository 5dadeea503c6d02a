use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// Bounded retry with exponential backoff.
///
/// `max_consecutive_failures` counts failures since the last success; the
/// attempt that reaches it is the last one.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_consecutive_failures: u32,
    /// Delay after the first failure.
    pub initial_delay: Duration,
    /// Backoff cap.
    pub max_delay: Duration,
    pub backoff_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_consecutive_failures: 3,
            initial_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(5),
            backoff_factor: 2.0,
        }
    }
}

impl RetryPolicy {
    /// A policy that retries without waiting.
    pub fn immediate(max_consecutive_failures: u32) -> Self {
        Self {
            max_consecutive_failures,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            ..Self::default()
        }
    }

    /// Returns `true` once `failures` consecutive failures end the run.
    pub fn exhausted(&self, failures: u32) -> bool {
        failures >= self.max_consecutive_failures.max(1)
    }

    /// Delay before the attempt following failure number `failure` (1-based).
    pub fn delay_for_attempt(&self, failure: u32) -> Duration {
        let exp = failure.saturating_sub(1).min(63) as i32;
        let secs = self.initial_delay.as_secs_f64() * self.backoff_factor.powi(exp);
        Duration::from_secs_f64(secs.min(self.max_delay.as_secs_f64()).max(0.0))
    }

    /// Sleeps for the backoff of `failure`. Returns `false` if cancelled first.
    pub async fn backoff(&self, failure: u32, cancel: &CancellationToken) -> bool {
        let delay = self.delay_for_attempt(failure);
        if delay.is_zero() {
            return !cancel.is_cancelled();
        }
        tokio::select! {
            _ = cancel.cancelled() => false,
            _ = tokio::time::sleep(delay) => true,
        }
    }
}
