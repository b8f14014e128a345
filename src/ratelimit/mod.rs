use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

use crate::config::ThrottleConfig;

pub mod classify;
pub mod gate;
pub mod retry;

pub use classify::{classify, is_rate_limit_error, FailureKind};
pub use gate::ThrottleGate;
pub use retry::{Attempt, RetryEnvelope, RetryError};

/// Seconds to `Duration`, saturating at `Duration::MAX` when out of range
pub(crate) fn saturating_duration(secs: f64) -> Duration {
    Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
}

/// The single entry point to the rate-limited resource.
///
/// Construct one per process and pass it by reference to every caller; the
/// gate's memory of the last call is what keeps requests spaced.
#[derive(Debug)]
pub struct RateLimitedExecutor {
    config: ThrottleConfig,
    gate: ThrottleGate,
    retry: RetryEnvelope,
}

impl RateLimitedExecutor {
    pub fn new(config: ThrottleConfig) -> Self {
        let min_delay = Duration::from_millis(config.min_delay_ms);
        Self {
            gate: ThrottleGate::new(min_delay, config.jitter_enabled),
            retry: RetryEnvelope::new(config.max_retries, min_delay, config.backoff_multiplier),
            config,
        }
    }

    pub fn config(&self) -> &ThrottleConfig {
        &self.config
    }

    /// Wait for the throttle gate, then run `operation` inside the retry envelope
    pub async fn execute<T, E, F, Fut>(&self, operation: F) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        let delay = self.gate.compute_delay(Instant::now());
        if !delay.is_zero() {
            tracing::debug!(delay_ms = delay.as_millis() as u64, "Throttling request");
            tokio::time::sleep(delay).await;
        }

        self.retry.execute_with_retry(operation).await
    }
}
