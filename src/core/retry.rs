//! Retry logic with exponential backoff
//!
//! Bounded retries for operations whose failures may be transient. Errors
//! decide for themselves whether another attempt makes sense.

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

use crate::core::error::PublishError;

/// Options for retry behavior
#[derive(Debug, Clone, PartialEq)]
pub struct RetryOptions {
    /// Maximum number of attempts, including the first one
    pub max_attempts: u32,
    /// Initial delay before first retry
    pub initial_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
    /// Backoff multiplier for exponential backoff
    pub backoff_multiplier: f64,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
        }
    }
}

/// Errors that know whether the failed operation can be attempted again
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

impl Retryable for PublishError {
    fn is_retryable(&self) -> bool {
        PublishError::is_retryable(self)
    }
}

/// Retry manager for executing operations with exponential backoff
///
/// # Examples
///
/// ```no_run
/// use release_publisher::core::{PublishError, RetryManager, RetryOptions};
///
/// # async fn example() -> Result<(), PublishError> {
/// let manager = RetryManager::new(RetryOptions::default());
///
/// let value = manager
///     .retry(|| async { Ok::<_, PublishError>("created") })
///     .await?;
/// assert_eq!(value, "created");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct RetryManager {
    options: RetryOptions,
}

impl RetryManager {
    /// Create a new RetryManager with the given options
    pub fn new(options: RetryOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &RetryOptions {
        &self.options
    }

    /// Execute the given async operation with retry logic
    ///
    /// The operation runs at most `max_attempts` times. A non-retryable error
    /// is returned immediately; the last retryable error is returned once the
    /// attempts are exhausted.
    pub async fn retry<F, Fut, T, E>(&self, mut operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable + std::fmt::Display,
    {
        let max_attempts = self.options.max_attempts.max(1);
        let mut delay = self.options.initial_delay;
        let mut attempt = 1;

        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(error) => {
                    if !error.is_retryable() || attempt >= max_attempts {
                        return Err(error);
                    }

                    tracing::warn!(
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        "{error}, retrying"
                    );

                    sleep(delay).await;

                    delay = Duration::from_secs_f64(
                        delay.as_secs_f64() * self.options.backoff_multiplier,
                    )
                    .min(self.options.max_delay);
                    attempt += 1;
                }
            }
        }
    }
}
