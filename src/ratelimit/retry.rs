//! Bounded exponential-backoff retry for rate-limited operations.
//!
//! Only errors that [`classify`](super::classify) as rate limiting are retried.
//! Every other failure is returned after a single attempt.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use super::classify::{classify, FailureKind};
use super::saturating_duration;

/// Result of one attempt, tagged by how the envelope should react
#[derive(Debug)]
pub enum Attempt<T, E> {
    Ok(T),
    RateLimited(E),
    Fatal(E),
}

impl<T, E: fmt::Display> From<Result<T, E>> for Attempt<T, E> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => Attempt::Ok(value),
            Err(e) => match classify(&e.to_string()) {
                FailureKind::RateLimited => Attempt::RateLimited(e),
                _ => Attempt::Fatal(e),
            },
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum RetryError<E> {
    #[error("Max retries ({max_retries}) exceeded. Rate limit persists. Original error: {error}")]
    MaxRetriesExceeded {
        max_retries: u32,
        attempts: u32,
        error: E,
    },

    #[error("{0}")]
    Operation(E),
}

impl<E> RetryError<E> {
    /// The error returned by the last attempt
    pub fn inner(&self) -> &E {
        match self {
            RetryError::MaxRetriesExceeded { error, .. } => error,
            RetryError::Operation(error) => error,
        }
    }
}

/// Retry policy: `max_retries` extra attempts, sleeping
/// `base_delay * multiplier^(attempt - 1)` before each one
#[derive(Debug, Clone)]
pub struct RetryEnvelope {
    max_retries: u32,
    base_delay: Duration,
    multiplier: f64,
}

impl RetryEnvelope {
    pub fn new(max_retries: u32, base_delay: Duration, multiplier: f64) -> Self {
        Self {
            max_retries,
            base_delay,
            multiplier,
        }
    }

    /// Backoff slept after the given failed attempt (1-based), saturating at `Duration::MAX`
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1) as i32;
        saturating_duration(self.base_delay.as_secs_f64() * self.multiplier.powi(exponent))
    }

    pub async fn execute_with_retry<T, E, F, Fut>(
        &self,
        mut operation: F,
    ) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        let mut attempt: u32 = 1;

        loop {
            match Attempt::from(operation().await) {
                Attempt::Ok(value) => {
                    if attempt > 1 {
                        tracing::info!(attempts = attempt, "Operation succeeded after retry");
                    }
                    return Ok(value);
                }
                Attempt::Fatal(error) => {
                    tracing::debug!(error = %error, "Operation failed with non-retryable error");
                    return Err(RetryError::Operation(error));
                }
                Attempt::RateLimited(error) if attempt <= self.max_retries => {
                    let backoff = self.backoff_for(attempt);
                    tracing::warn!(
                        error = %error,
                        attempt,
                        max_retries = self.max_retries,
                        delay_ms = backoff.as_millis() as u64,
                        "Rate limited, backing off"
                    );
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                Attempt::RateLimited(error) => {
                    tracing::error!(
                        error = %error,
                        attempts = attempt,
                        "Rate limit persisted after all retries"
                    );
                    return Err(RetryError::MaxRetriesExceeded {
                        max_retries: self.max_retries,
                        attempts: attempt,
                        error,
                    });
                }
            }
        }
    }
}
