//! Bounded attempts with exponential backoff, used for the availability poll and for retrying
//! transient control-plane failures.

use crate::constants::{
    DEFAULT_BACKOFF_MULTIPLIER, DEFAULT_MAX_POLLS, DEFAULT_MAX_POLL_INTERVAL,
    DEFAULT_POLL_INTERVAL, TRANSIENT_RETRY_ATTEMPTS, TRANSIENT_RETRY_INITIAL_DELAY,
};
use crate::control_plane::ApiResult;
use log::warn;
use std::future::Future;
use std::time::Duration;

#[derive(Clone, Debug, PartialEq)]
pub struct Backoff {
    /// The most times the operation is attempted. Always at least one.
    pub max_attempts: u32,
    /// Delay after the first attempt.
    pub initial_delay: Duration,
    /// Upper bound for any single delay.
    pub max_delay: Duration,
    /// Growth factor applied to the delay after each attempt.
    pub multiplier: f64,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_POLLS,
            initial_delay: DEFAULT_POLL_INTERVAL,
            max_delay: DEFAULT_MAX_POLL_INTERVAL,
            multiplier: DEFAULT_BACKOFF_MULTIPLIER,
        }
    }
}

impl Backoff {
    /// The same delay between every attempt.
    pub fn fixed(interval: Duration, max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_delay: interval,
            max_delay: interval,
            multiplier: 1.0,
        }
    }

    /// Poll every `interval` to begin with, backing off to the default ceiling.
    pub fn polling(interval: Duration, max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_delay: interval,
            max_delay: DEFAULT_MAX_POLL_INTERVAL.max(interval),
            ..Default::default()
        }
    }

    pub fn transient() -> Self {
        Self {
            max_attempts: TRANSIENT_RETRY_ATTEMPTS,
            initial_delay: TRANSIENT_RETRY_INITIAL_DELAY,
            max_delay: Duration::from_secs(8),
            multiplier: 2.0,
        }
    }

    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// The delay to wait after attempt number `attempt` (starting at 1) failed.
    pub fn delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let secs = self.initial_delay.as_secs_f64() * self.multiplier.max(1.0).powi(exponent);
        if !secs.is_finite() || secs >= self.max_delay.as_secs_f64() {
            self.max_delay
        } else {
            Duration::from_secs_f64(secs)
        }
    }
}

/// Run `operation` until it succeeds, fails with an error that is not retryable, or runs out of
/// attempts. The last error is returned when attempts are exhausted.
pub async fn retry_transient<F, Fut, T>(
    backoff: &Backoff,
    operation_name: &str,
    mut operation: F,
) -> ApiResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ApiResult<T>>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) if e.kind().is_retryable() && attempt < backoff.attempts() => {
                let delay = backoff.delay(attempt);
                warn!(
                    "'{}' failed (attempt {} of {}), retrying in {:?}: {}",
                    operation_name,
                    attempt,
                    backoff.attempts(),
                    delay,
                    e
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}
