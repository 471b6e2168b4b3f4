//! Bounded exponential-backoff retry for completion calls.

use super::{CompletionError, ErrorClass};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Retry schedule for completion calls.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Delay after the first failed attempt.
    pub initial_backoff: Duration,
    /// Factor applied to the delay after each further failure.
    pub multiplier: u32,
    /// Upper bound for a single delay.
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff: Duration::from_secs(1),
            multiplier: 2,
            max_backoff: Duration::from_secs(20),
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after `attempt` (1-based) has failed.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        let factor = self.multiplier.saturating_pow(exponent);
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }

    /// Whether a failure of this class should be retried.
    pub fn should_retry(&self, class: ErrorClass) -> bool {
        class == ErrorClass::Transient
    }
}

/// The last failure of an operation, with the number of attempts made.
#[derive(Debug)]
pub struct RetryError {
    pub error: CompletionError,
    pub attempts: u32,
}

/// Run `op` until it succeeds, fails permanently, or the attempts run out.
///
/// `op` receives the 1-based attempt number.
pub async fn retry<T, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<T, RetryError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, CompletionError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(error) => {
                if !policy.should_retry(error.class) || attempt >= max_attempts {
                    return Err(RetryError {
                        error,
                        attempts: attempt,
                    });
                }

                let delay = policy.backoff(attempt);
                warn!(
                    attempt,
                    max_attempts,
                    ?delay,
                    "Completion attempt failed: {}",
                    error.message
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
