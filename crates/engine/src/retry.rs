//! Bounded retry for transient transport failures.

use std::{fmt::Display, future::Future, time::Duration};

use {courier_config::RetryConfig, tracing::warn};

/// How a failure should be treated by [`RetryPolicy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryClass {
    /// Server asked us to wait this long before trying again.
    RateLimited(Duration),
    /// The request did not complete in time.
    TimedOut,
    /// Retrying the same request will not help.
    Permanent,
}

/// Error classifier consumed by [`RetryPolicy`].
pub trait Classify {
    fn retry_class(&self) -> RetryClass;

    fn is_permanent(&self) -> bool {
        self.retry_class() == RetryClass::Permanent
    }
}

/// Attempt ceiling plus backoff schedule, shared by every delivery path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    timeout_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl RetryPolicy {
    /// `max_attempts` counts the first attempt and is clamped to at least 1.
    #[must_use]
    pub fn new(max_attempts: u32, timeout_backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            timeout_backoff,
        }
    }

    #[must_use]
    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(
            config.max_attempts,
            Duration::from_millis(config.timeout_backoff_ms),
        )
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Wait before the next attempt, or `None` when the failure is permanent.
    pub fn backoff(&self, class: RetryClass) -> Option<Duration> {
        match class {
            RetryClass::RateLimited(wait) => Some(wait),
            RetryClass::TimedOut => Some(self.timeout_backoff),
            RetryClass::Permanent => None,
        }
    }

    /// Run `request` until it succeeds, fails permanently, or the attempt
    /// ceiling is reached. `request` is invoked once per attempt so it can
    /// rebuild single-use inputs (upload streams) each time.
    pub async fn run<T, E, F, Fut>(&self, operation: &'static str, mut request: F) -> Result<T, E>
    where
        E: Classify + Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut attempt = 1u32;

        loop {
            match request().await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    let Some(wait) = self.backoff(err.retry_class()) else {
                        return Err(err);
                    };

                    if attempt >= self.max_attempts {
                        warn!(
                            operation,
                            attempt,
                            max_attempts = self.max_attempts,
                            error = %err,
                            "transient failure persisted after retries"
                        );
                        return Err(err);
                    }

                    warn!(
                        operation,
                        attempt,
                        max_attempts = self.max_attempts,
                        wait_ms = wait.as_millis() as u64,
                        error = %err,
                        "transient failure, waiting before retry"
                    );
                    tokio::time::sleep(wait).await;
                    attempt += 1;
                },
            }
        }
    }
}
