//! Retry with exponential backoff and jitter for fallible async operations
//!
//! Errors are classified as retryable or fatal by inspecting their message.
//! Running out of attempts and hitting a fatal error are reported as two
//! distinct [`RetryError`] variants.

#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

mod classify;
mod error;

use std::fmt;
use std::future::Future;
use std::time::Duration;

use rand::Rng;

pub use classify::is_retryable_error;
pub use error::RetryError;

/// Default delay before the first retry
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(2_000);

/// Default upper bound for any single delay
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_millis(30_000);

/// Default upper bound (exclusive) for the random jitter
pub const DEFAULT_JITTER: Duration = Duration::from_millis(3_000);

type Classifier<E> = Box<dyn Fn(&E) -> bool + Send + Sync>;
type RetryHook<E> = Box<dyn Fn(u32, &E, Duration) + Send + Sync>;

/// Retry configuration for [`with_retry`]
pub struct RetryOptions<E> {
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
    jitter: Duration,
    retry_after: Option<Duration>,
    should_retry: Classifier<E>,
    on_retry: Option<RetryHook<E>>,
}

impl<E: fmt::Display + 'static> RetryOptions<E> {
    /// Options with the default backoff and the message-based classifier
    ///
    /// A `max_attempts` of zero is treated as one.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            jitter: DEFAULT_JITTER,
            retry_after: None,
            should_retry: Box::new(|error: &E| is_retryable_error(error)),
            on_retry: None,
        }
    }
}

impl<E> RetryOptions<E> {
    #[must_use]
    pub const fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    #[must_use]
    pub const fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    #[must_use]
    pub const fn with_jitter(mut self, jitter: Duration) -> Self {
        self.jitter = jitter;
        self
    }

    /// Server-supplied delay honoured for the first retry only
    #[must_use]
    pub const fn with_retry_after(mut self, delay: Duration) -> Self {
        self.retry_after = Some(delay);
        self
    }

    /// Parse a `Retry-After` header value in seconds
    ///
    /// Only the leading digits count, so `5.5` waits five seconds. Values
    /// that do not start with a digit are ignored.
    #[must_use]
    pub fn with_retry_after_header(mut self, header: &str) -> Self {
        let trimmed = header.trim_start();
        let digits = trimmed
            .find(|c: char| !c.is_ascii_digit())
            .map_or(trimmed, |end| &trimmed[..end]);
        if let Ok(seconds) = digits.parse::<u64>() {
            self.retry_after = Some(Duration::from_secs(seconds));
        }
        self
    }

    /// Replace the error classifier
    #[must_use]
    pub fn with_should_retry(mut self, classifier: impl Fn(&E) -> bool + Send + Sync + 'static) -> Self {
        self.should_retry = Box::new(classifier);
        self
    }

    /// Observe each scheduled retry as `(attempt, error, delay)`
    #[must_use]
    pub fn with_on_retry(mut self, hook: impl Fn(u32, &E, Duration) + Send + Sync + 'static) -> Self {
        self.on_retry = Some(Box::new(hook));
        self
    }

    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay before the retry that follows `attempt` (1-based)
    ///
    /// A server-supplied delay wins when present, capped at the maximum.
    /// Otherwise `base * 2^(attempt-1)` plus jitter in `[0, jitter)`, capped.
    pub fn delay_for(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        if let Some(delay) = retry_after {
            return delay.min(self.max_delay);
        }

        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        let exponential = self.base_delay.saturating_mul(factor);

        exponential.saturating_add(random_jitter(self.jitter)).min(self.max_delay)
    }
}

impl<E> fmt::Debug for RetryOptions<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryOptions")
            .field("max_attempts", &self.max_attempts)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .field("jitter", &self.jitter)
            .field("retry_after", &self.retry_after)
            .field("on_retry", &self.on_retry.is_some())
            .finish_non_exhaustive()
    }
}

fn random_jitter(max: Duration) -> Duration {
    let max_ms = u64::try_from(max.as_millis()).unwrap_or(u64::MAX);
    if max_ms == 0 {
        return Duration::ZERO;
    }

    Duration::from_millis(rand::rng().random_range(0..max_ms))
}

/// Run `operation` until it succeeds, a fatal error occurs, or attempts run out
///
/// The final attempt always ends in [`RetryError::Exhausted`], whatever the
/// classifier says. An earlier failure the classifier rejects is returned
/// untouched as [`RetryError::NonRetryable`].
pub async fn with_retry<T, E, F, Fut>(mut operation: F, options: RetryOptions<E>) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    let mut retry_after = options.retry_after;
    let mut attempt = 1;

    loop {
        let delay = match operation().await {
            Ok(value) => return Ok(value),
            Err(error) => {
                if attempt >= options.max_attempts {
                    tracing::warn!(attempts = attempt, error = %error, "retry attempts exhausted");
                    return Err(RetryError::Exhausted {
                        attempts: attempt,
                        last_error: error,
                    });
                }

                if !(options.should_retry)(&error) {
                    tracing::debug!(attempt, error = %error, "error is not retryable");
                    return Err(RetryError::NonRetryable(error));
                }

                // Server-supplied delay applies to the first retry only
                let delay = options.delay_for(attempt, retry_after.take());

                if let Some(hook) = &options.on_retry {
                    hook(attempt, &error, delay);
                }

                tracing::warn!(
                    attempt,
                    max_attempts = options.max_attempts,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    error = %error,
                    "operation failed, retrying"
                );

                delay
            }
        };

        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}
