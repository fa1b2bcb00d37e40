//! Progressive-timeout retry.
//!
//! # Responsibilities
//! - Run an operation up to `max_attempts` times
//! - Give every attempt a larger deadline than the last (timeouts.rs)
//! - Sleep a linear backoff between attempts (backoff.rs)
//! - Re-read the access token before every attempt
//!
//! # Design Decisions
//! - Only timeouts, no-response errors and 503 are retried
//! - Everything else is returned from the first attempt
//! - A wall-clock ceiling stops the loop even if attempts remain

use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

use crate::auth::store::CredentialStore;
use crate::client::error::ApiError;
use crate::config::{RetryConfig, TimeoutConfig};
use crate::observability::metrics;
use crate::resilience::backoff::calculate_backoff;
use crate::resilience::timeouts::TimeoutSchedule;

/// What an operation gets for one attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempt {
    /// 1-based attempt number.
    pub number: u32,
    /// Deadline for this attempt.
    pub timeout: Duration,
    /// Access token as stored right before this attempt.
    pub access_token: Option<String>,
}

/// Retry settings.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub schedule: TimeoutSchedule,
    pub delay_step: Duration,
    pub max_delay: Duration,
    pub max_elapsed: Duration,
}

impl RetryPolicy {
    pub fn from_config(retries: &RetryConfig, timeouts: &TimeoutConfig) -> Self {
        Self {
            max_attempts: retries.max_attempts,
            schedule: TimeoutSchedule::from_config(timeouts),
            delay_step: Duration::from_millis(retries.delay_step_ms),
            max_delay: Duration::from_millis(retries.max_delay_ms),
            max_elapsed: Duration::from_millis(retries.max_elapsed_ms),
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Delay after the given attempt failed.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        calculate_backoff(
            attempt,
            self.delay_step.as_millis() as u64,
            self.max_delay.as_millis() as u64,
        )
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default(), &TimeoutConfig::default())
    }
}

/// Run `op` until it succeeds, fails with a non-retryable error, or the
/// policy is exhausted. The last error is returned on exhaustion.
pub async fn retry_with_progressive_timeout<T, F, Fut>(
    policy: &RetryPolicy,
    credentials: &dyn CredentialStore,
    mut op: F,
) -> Result<T, ApiError>
where
    F: FnMut(Attempt) -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    let started = Instant::now();
    let max_attempts = policy.max_attempts.max(1);
    let mut attempts = 0;

    loop {
        attempts += 1;

        let attempt = Attempt {
            number: attempts,
            timeout: policy.schedule.for_attempt(attempts),
            access_token: credentials.access_token()?,
        };
        let timeout = attempt.timeout;

        let error = match op(attempt).await {
            Ok(value) => {
                if attempts > 1 {
                    tracing::info!(attempt = attempts, "Request succeeded after retry");
                }
                return Ok(value);
            }
            Err(e) => e,
        };

        if !error.is_retryable() {
            return Err(error);
        }
        if attempts >= max_attempts {
            tracing::warn!(attempts, error = %error, "Retries exhausted");
            return Err(error);
        }

        let delay = policy.delay_after(attempts);
        if started.elapsed() + delay >= policy.max_elapsed {
            tracing::warn!(
                attempts,
                elapsed_ms = started.elapsed().as_millis() as u64,
                error = %error,
                "Retry time budget exhausted"
            );
            return Err(error);
        }

        tracing::warn!(
            attempt = attempts,
            timeout_ms = timeout.as_millis() as u64,
            delay_ms = delay.as_millis() as u64,
            error = %error,
            "Transient failure, retrying"
        );
        metrics::record_retry();
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::store::MemoryCredentialStore;
    use std::sync::Mutex;

    fn timeout_error() -> ApiError {
        ApiError::Timeout { timeout: Duration::from_secs(1) }
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempt_timeouts_follow_schedule() {
        let store = MemoryCredentialStore::new();
        let seen = Mutex::new(Vec::new());
        let policy = RetryPolicy::default().with_max_attempts(7);

        let result: Result<(), _> = retry_with_progressive_timeout(&policy, &store, |attempt| {
            seen.lock().unwrap().push(attempt.timeout.as_secs());
            async { Err(timeout_error()) }
        })
        .await;

        assert!(matches!(result, Err(ApiError::Timeout { .. })));
        assert_eq!(*seen.lock().unwrap(), vec![5, 10, 15, 20, 30, 45, 60]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_retryable_runs_once() {
        let store = MemoryCredentialStore::new();
        let mut calls = 0;

        let result: Result<(), _> = retry_with_progressive_timeout(&RetryPolicy::default(), &store, |_| {
            calls += 1;
            async {
                Err(ApiError::Status {
                    status: 404,
                    message: "not found".into(),
                    body: String::new(),
                })
            }
        })
        .await;

        assert_eq!(result.unwrap_err().status(), Some(404));
        assert_eq!(calls, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_delays_between_attempts() {
        let store = MemoryCredentialStore::new();
        let started = Instant::now();
        let stamps = Mutex::new(Vec::new());

        let result = retry_with_progressive_timeout(&RetryPolicy::default(), &store, |attempt| {
            stamps.lock().unwrap().push(started.elapsed());
            async move {
                if attempt.number < 3 {
                    Err(timeout_error())
                } else {
                    Ok(attempt.number)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 3);
        let stamps = stamps.lock().unwrap();
        assert_eq!(stamps[0], Duration::ZERO);
        assert_eq!(stamps[1], Duration::from_millis(2000));
        assert_eq!(stamps[2], Duration::from_millis(6000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_token_reread_per_attempt() {
        let store = MemoryCredentialStore::with_session("old", "refresh");
        let tokens = Mutex::new(Vec::new());

        let _: Result<(), _> = retry_with_progressive_timeout(
            &RetryPolicy::default().with_max_attempts(2),
            &store,
            |attempt| {
                tokens.lock().unwrap().push(attempt.access_token.clone());
                store.set(crate::auth::CredentialKey::AccessToken, "new").unwrap();
                async { Err(ApiError::Network("connection reset".into())) }
            },
        )
        .await;

        assert_eq!(
            *tokens.lock().unwrap(),
            vec![Some("old".to_string()), Some("new".to_string())]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_elapsed_ceiling_stops_early() {
        let store = MemoryCredentialStore::new();
        let mut policy = RetryPolicy::default();
        policy.max_elapsed = Duration::from_secs(5);
        let mut calls = 0;

        let _: Result<(), _> = retry_with_progressive_timeout(&policy, &store, |_| {
            calls += 1;
            async { Err(timeout_error()) }
        })
        .await;

        // 2s after the first attempt, 4s after the second would cross 5s.
        assert_eq!(calls, 2);
    }
}
