//! Retry with exponential backoff and jitter.
//!
//! [`execute`] wraps any fallible async operation. It knows nothing about
//! what it wraps: the [`RetryPolicy`] predicate decides which errors are
//! worth another attempt, and errors are always returned unchanged.
//!
//! Delays grow by a random factor in `[1.5, 2.0)` per attempt and are capped
//! at `max_delay`, so clients failing together do not retry in lockstep.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use rand::Rng;

use crate::error::HealthLinkError;

/// Lower bound of the per-attempt backoff multiplier.
const BACKOFF_BASE: f64 = 1.5;

/// Width of the random part of the multiplier.
const BACKOFF_JITTER: f64 = 0.5;

/// Retry configuration for one call site.
pub struct RetryPolicy<E = HealthLinkError> {
    /// Retries after the first attempt (0 = single attempt).
    pub max_retries: u32,
    /// Seed delay; the first wait is already multiplied once.
    pub initial_delay: Duration,
    /// Upper bound for any single wait.
    pub max_delay: Duration,
    /// Whether an error is worth another attempt.
    pub should_retry: fn(&E) -> bool,
}

impl<E> std::fmt::Debug for RetryPolicy<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_retries", &self.max_retries)
            .field("initial_delay", &self.initial_delay)
            .field("max_delay", &self.max_delay)
            .finish_non_exhaustive()
    }
}

impl<E> Clone for RetryPolicy<E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E> Copy for RetryPolicy<E> {}

impl<E> RetryPolicy<E> {
    /// Create a policy from its parts.
    #[must_use]
    pub const fn new(
        max_retries: u32,
        initial_delay: Duration,
        max_delay: Duration,
        should_retry: fn(&E) -> bool,
    ) -> Self {
        Self {
            max_retries,
            initial_delay,
            max_delay,
            should_retry,
        }
    }

    /// A policy that never retries.
    #[must_use]
    pub const fn never() -> Self {
        Self {
            max_retries: 0,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            should_retry: never_retry::<E>,
        }
    }

    /// Same timing, different predicate.
    #[must_use]
    pub const fn with_predicate(self, should_retry: fn(&E) -> bool) -> Self {
        Self {
            should_retry,
            ..self
        }
    }
}

impl RetryPolicy<HealthLinkError> {
    /// Default number of retries.
    pub const DEFAULT_MAX_RETRIES: u32 = 3;
    /// Default seed delay.
    pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_millis(1000);
    /// Default cap on a single wait.
    pub const DEFAULT_MAX_DELAY: Duration = Duration::from_millis(5000);

    /// For reads and other idempotent calls: retry every transient failure.
    #[must_use]
    pub const fn idempotent() -> Self {
        Self::new(
            Self::DEFAULT_MAX_RETRIES,
            Self::DEFAULT_INITIAL_DELAY,
            Self::DEFAULT_MAX_DELAY,
            HealthLinkError::is_retryable,
        )
    }

    /// For calls with remote side effects: retry only when the request
    /// never reached the server.
    #[must_use]
    pub const fn mutating() -> Self {
        Self::new(
            Self::DEFAULT_MAX_RETRIES,
            Self::DEFAULT_INITIAL_DELAY,
            Self::DEFAULT_MAX_DELAY,
            HealthLinkError::is_unsent,
        )
    }
}

const fn never_retry<E>(_: &E) -> bool {
    false
}

/// Compute the wait before the next attempt.
///
/// `jitter` is expected in `[0, 1)`; the result is
/// `min(previous * (1.5 + jitter * 0.5), max_delay)`.
#[must_use]
pub fn next_delay(previous: Duration, max_delay: Duration, jitter: f64) -> Duration {
    let factor = BACKOFF_JITTER.mul_add(jitter.clamp(0.0, 1.0), BACKOFF_BASE);
    Duration::try_from_secs_f64(previous.as_secs_f64() * factor)
        .unwrap_or(max_delay)
        .min(max_delay)
}

/// Run `operation` until it succeeds, the policy declines, or retries run out.
///
/// A permanently failing retryable operation is attempted `max_retries + 1`
/// times; the last error is returned as-is.
///
/// # Errors
///
/// Returns the operation's own error when it is not retryable or when the
/// retry budget is exhausted.
pub async fn execute<T, E, F, Fut>(policy: &RetryPolicy<E>, mut operation: F) -> Result<T, E>
where
    E: Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut failures: u32 = 0;
    let mut delay = policy.initial_delay;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                failures += 1;
                if failures > policy.max_retries || !(policy.should_retry)(&err) {
                    if failures > 1 {
                        tracing::debug!(attempts = failures, error = %err, "Giving up after retries");
                    }
                    return Err(err);
                }

                let jitter: f64 = rand::thread_rng().r#gen();
                delay = next_delay(delay, policy.max_delay, jitter);
                tracing::warn!(
                    attempt = failures,
                    max_retries = policy.max_retries,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    error = %err,
                    "Retrying after transient failure"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

/// Like [`execute`], with an optional hard wall-clock deadline over all attempts.
///
/// # Errors
///
/// Returns [`HealthLinkError::DeadlineExceeded`] when the deadline elapses
/// first, otherwise whatever [`execute`] returns.
pub async fn execute_with_deadline<T, F, Fut>(
    policy: &RetryPolicy<HealthLinkError>,
    deadline: Option<Duration>,
    operation: F,
) -> Result<T, HealthLinkError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, HealthLinkError>>,
{
    match deadline {
        None => execute(policy, operation).await,
        Some(limit) => tokio::time::timeout(limit, execute(policy, operation))
            .await
            .unwrap_or_else(|_| {
                tracing::warn!(deadline_secs = limit.as_secs(), "Retry deadline exceeded");
                Err(HealthLinkError::DeadlineExceeded(limit.as_secs()))
            }),
    }
}

/// The pair of policies every service uses, plus the optional deadline.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicies {
    /// Policy for idempotent reads.
    pub read: RetryPolicy,
    /// Policy for calls with remote side effects.
    pub write: RetryPolicy,
    /// Hard limit over all attempts of a single call.
    pub deadline: Option<Duration>,
}

impl Default for RetryPolicies {
    fn default() -> Self {
        Self {
            read: RetryPolicy::idempotent(),
            write: RetryPolicy::mutating(),
            deadline: None,
        }
    }
}

impl RetryPolicies {
    /// Build both policies from shared timing values.
    #[must_use]
    pub const fn from_timing(
        max_retries: u32,
        initial_delay: Duration,
        max_delay: Duration,
        deadline: Option<Duration>,
    ) -> Self {
        Self {
            read: RetryPolicy::new(
                max_retries,
                initial_delay,
                max_delay,
                HealthLinkError::is_retryable,
            ),
            write: RetryPolicy::new(
                max_retries,
                initial_delay,
                max_delay,
                HealthLinkError::is_unsent,
            ),
            deadline,
        }
    }

    /// Policies with no waiting at all, for tests and fakes.
    #[must_use]
    pub const fn immediate(max_retries: u32) -> Self {
        Self::from_timing(max_retries, Duration::ZERO, Duration::ZERO, None)
    }

    /// Run an idempotent call.
    ///
    /// # Errors
    ///
    /// See [`execute_with_deadline`].
    pub async fn read<T, F, Fut>(&self, operation: F) -> Result<T, HealthLinkError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, HealthLinkError>>,
    {
        execute_with_deadline(&self.read, self.deadline, operation).await
    }

    /// Run a call with remote side effects.
    ///
    /// # Errors
    ///
    /// See [`execute_with_deadline`].
    pub async fn write<T, F, Fut>(&self, operation: F) -> Result<T, HealthLinkError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, HealthLinkError>>,
    {
        execute_with_deadline(&self.write, self.deadline, operation).await
    }
}
