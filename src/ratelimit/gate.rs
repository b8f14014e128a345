use rand::Rng;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

use super::saturating_duration;

const JITTER_LOW: f64 = 0.8;
const JITTER_HIGH: f64 = 1.2;

/// Enforces a minimum spacing between calls to the rate-limited resource
#[derive(Debug)]
pub struct ThrottleGate {
    min_delay: Duration,
    jitter: bool,
    /// Permitted start time of the most recent call, `None` before the first one
    last_call: Mutex<Option<Instant>>,
}

impl ThrottleGate {
    pub fn new(min_delay: Duration, jitter: bool) -> Self {
        Self {
            min_delay,
            jitter,
            last_call: Mutex::new(None),
        }
    }

    /// Compute how long a call arriving at `now` must wait, and reserve its slot.
    ///
    /// The recorded timestamp is the permitted start time (`now + delay`), so the
    /// next reservation is spaced from when this call actually runs.
    pub fn compute_delay(&self, now: Instant) -> Duration {
        let mut last_call = self.last_call.lock().unwrap_or_else(PoisonError::into_inner);

        let delay = match *last_call {
            None => Duration::ZERO,
            Some(last) => {
                let required = last
                    .checked_add(self.min_delay)
                    .map_or(Duration::MAX, |earliest| earliest.saturating_duration_since(now));
                if self.jitter {
                    apply_jitter(required)
                } else {
                    required
                }
            }
        };

        *last_call = Some(now.checked_add(delay).unwrap_or(now));
        delay
    }

    pub fn min_delay(&self) -> Duration {
        self.min_delay
    }
}

/// Scale a delay by a uniform factor in [0.8, 1.2]
fn apply_jitter(delay: Duration) -> Duration {
    if delay.is_zero() {
        return delay;
    }
    let factor: f64 = rand::thread_rng().gen_range(JITTER_LOW..=JITTER_HIGH);
    saturating_duration(delay.as_secs_f64() * factor)
}
