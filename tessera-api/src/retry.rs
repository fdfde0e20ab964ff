//! Retry combinator for upstream calls.
//!
//! Every attempt runs under a fixed deadline. Failures are classified with
//! [`UpstreamError::class`]: transient ones (no response, timeout, 5xx) are
//! retried after a linear backoff until the budget is spent, anything else
//! is returned on the spot.

use std::future::Future;
use std::time::Duration;

use tessera_core::{UpstreamError, UpstreamResult};

use crate::config::{DEFAULT_BACKOFF_MS, DEFAULT_MAX_RETRIES, DEFAULT_UPSTREAM_TIMEOUT_MS};
use crate::telemetry::METRICS;

/// Attempt budget, backoff schedule, and per-attempt deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Wait before retry `n` is `backoff_base * n`. No jitter.
    pub backoff_base: Duration,
    /// Deadline for each individual attempt.
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_base: Duration::from_millis(DEFAULT_BACKOFF_MS),
            attempt_timeout: Duration::from_millis(DEFAULT_UPSTREAM_TIMEOUT_MS),
        }
    }
}

impl RetryPolicy {
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Delay after failed attempt number `attempt` (1-based).
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        self.backoff_base.saturating_mul(attempt)
    }
}

/// Run `f` under `policy`.
///
/// `operation` labels logs and metrics; `path` is the upstream path used in
/// timeout errors. An exhausted budget comes back as
/// [`UpstreamError::Unavailable`] wrapping the last failure.
pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    operation: &'static str,
    path: &str,
    mut f: F,
) -> UpstreamResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = UpstreamResult<T>>,
{
    let max_attempts = policy.max_attempts();
    let mut attempt = 1;

    loop {
        let outcome = match tokio::time::timeout(policy.attempt_timeout, f()).await {
            Ok(result) => result,
            Err(_) => Err(UpstreamError::Timeout {
                path: path.to_string(),
                after_ms: u64::try_from(policy.attempt_timeout.as_millis()).unwrap_or(u64::MAX),
            }),
        };

        let err = match outcome {
            Ok(value) => {
                record_attempt(operation, "success");
                tracing::debug!(operation, path, attempt, "Upstream call succeeded");
                return Ok(value);
            }
            Err(err) => err,
        };

        let label = if err.is_not_found() {
            "not_found"
        } else {
            err.class().as_str()
        };
        record_attempt(operation, label);

        if !err.is_transient() {
            tracing::debug!(operation, path, attempt, error = %err, "Upstream call failed permanently");
            return Err(err);
        }

        if attempt >= max_attempts {
            tracing::error!(
                operation,
                path,
                attempts = attempt,
                error = %err,
                "Upstream retry budget exhausted"
            );
            return Err(UpstreamError::Unavailable {
                attempts: attempt,
                last: Box::new(err),
            });
        }

        let delay = policy.backoff_for(attempt);
        tracing::warn!(
            operation,
            path,
            attempt,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            error = %err,
            "Transient upstream failure, retrying"
        );
        if let Ok(metrics) = METRICS.as_ref() {
            metrics.record_upstream_retry(operation);
        }

        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}

fn record_attempt(operation: &str, outcome: &str) {
    if let Ok(metrics) = METRICS.as_ref() {
        metrics.record_upstream_attempt(operation, outcome);
    }
}
