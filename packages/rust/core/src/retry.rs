//! Retry policy for completion calls.

use std::future::Future;
use std::time::Duration;

use devlog_shared::{GenerationError, GenerationSettings};
use tracing::warn;

/// Upper bound on a server-requested `Retry-After` wait.
const MAX_RETRY_AFTER: Duration = Duration::from_secs(60);

/// Delay schedule between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Same delay after every failed attempt.
    Fixed(Duration),
    /// `base * 2^(n-1)` after the n-th failed attempt, capped at `max`.
    Exponential { base: Duration, max: Duration },
}

impl Backoff {
    /// Delay following failed attempt number `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        match *self {
            Self::Fixed(delay) => delay,
            Self::Exponential { base, max } => {
                let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
                base.saturating_mul(factor).min(max)
            }
        }
    }
}

/// All attempts failed, or a non-retryable error stopped the loop early.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("gave up after {attempts} attempt(s): {last_error}")]
pub struct RetryExhausted {
    pub attempts: u32,
    pub last_error: GenerationError,
}

/// How many times to try and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Backoff::Fixed(Duration::from_secs(2)),
        }
    }
}

impl From<&GenerationSettings> for RetryPolicy {
    fn from(settings: &GenerationSettings) -> Self {
        Self::new(settings.max_attempts, Backoff::Fixed(settings.retry_delay))
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Backoff) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    /// Delays actually slept for a call that fails every attempt.
    /// There is no delay after the last attempt.
    pub fn schedule(&self) -> Vec<Duration> {
        (1..self.max_attempts)
            .map(|n| self.backoff.delay_after(n))
            .collect()
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, or
    /// `max_attempts` is reached. `op` receives the 1-based attempt number.
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Result<T, RetryExhausted>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, GenerationError>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            let err = match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            if !err.is_retryable() || attempt >= max_attempts {
                return Err(RetryExhausted {
                    attempts: attempt,
                    last_error: err,
                });
            }

            let mut delay = self.backoff.delay_after(attempt);
            if let GenerationError::RateLimited {
                retry_after_secs: Some(secs),
            } = &err
            {
                delay = delay.max(Duration::from_secs(*secs).min(MAX_RETRY_AFTER));
            }

            warn!(
                label,
                attempt,
                max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "completion failed, retrying"
            );
            tokio::time::sleep(delay).await;
        }
    }
}
