//! Client-side throttle for completion calls.

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::trace;

/// Smallest interval enforced between calls, used when the rate is unlimited.
pub const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Enforces a minimum interval between consecutive calls.
///
/// The limiter is shared by every flow that talks to the completion backend.
/// The last-call timestamp is updated under a mutex and the lock is held while
/// sleeping, so concurrent callers are released one interval apart.
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    last: Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// Create a limiter allowing `rps` calls per second.
    ///
    /// A non-positive or non-finite rate is treated as unlimited, but calls are
    /// still spaced by [`MIN_INTERVAL`].
    pub fn new(rps: f64) -> Self {
        let min_interval = if rps.is_finite() && rps > 0.0 {
            Duration::try_from_secs_f64(1.0 / rps).unwrap_or(Duration::MAX)
        } else {
            MIN_INTERVAL
        };

        Self {
            min_interval: min_interval.max(MIN_INTERVAL),
            last: Mutex::new(None),
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Wait until the next call is allowed.
    pub async fn wait(&self) {
        let mut last = self.last.lock().await;

        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                let delay = self.min_interval - elapsed;
                trace!("Throttling for {:?}", delay);
                tokio::time::sleep(delay).await;
            }
        }

        *last = Some(Instant::now());
    }
}
