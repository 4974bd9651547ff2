// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Exponential backoff with jitter around a fallible async send.
//!
//! Attempt 0 runs immediately. After a failed attempt `n` (while
//! `n < max_retries`) the caller waits `base * 2^n + uniform(0, max_jitter)`.
//! Waits are cooperative `tokio::time::sleep` calls raced against a
//! [`CancellationToken`], so only the current task is suspended.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use courier_core::CourierError;
use rand::Rng;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Backoff parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub base_delay: Duration,
    /// Upper bound (inclusive) of the uniform jitter.
    pub max_jitter: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(1000),
            max_jitter: Duration::from_millis(1000),
        }
    }
}

impl BackoffPolicy {
    /// The deterministic part of the wait after failed attempt `attempt`.
    pub fn base_delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }

    /// The full wait after failed attempt `attempt`, jitter included.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let jitter_ms = self.max_jitter.as_millis() as u64;
        let jitter = if jitter_ms == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..=jitter_ms)
        };
        self.base_delay_for(attempt) + Duration::from_millis(jitter)
    }
}

/// A successful result together with the number of retries it took.
#[derive(Debug, Clone, PartialEq)]
pub struct Retried<T> {
    pub value: T,
    /// Attempts beyond the first (0 = first-attempt success).
    pub retry_count: u32,
}

/// The last error after all attempts were used, or a cancellation.
#[derive(Debug)]
pub struct RetryFailure {
    pub error: CourierError,
    /// Attempts beyond the first that were actually made.
    pub retry_count: u32,
}

type RetryPredicate = Arc<dyn Fn(&CourierError) -> bool + Send + Sync>;

/// Wraps an async operation with bounded exponential-backoff retries.
///
/// By default every failure is retried regardless of its category.
#[derive(Clone)]
pub struct BackoffRetrier {
    policy: BackoffPolicy,
    should_retry: Option<RetryPredicate>,
}

impl std::fmt::Debug for BackoffRetrier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackoffRetrier")
            .field("policy", &self.policy)
            .field("should_retry", &self.should_retry.is_some())
            .finish()
    }
}

impl BackoffRetrier {
    pub fn new(policy: BackoffPolicy) -> Self {
        Self {
            policy,
            should_retry: None,
        }
    }

    /// Stops retrying as soon as `predicate` returns false for a failure.
    pub fn with_retry_predicate<P>(mut self, predicate: P) -> Self
    where
        P: Fn(&CourierError) -> bool + Send + Sync + 'static,
    {
        self.should_retry = Some(Arc::new(predicate));
        self
    }

    pub fn policy(&self) -> &BackoffPolicy {
        &self.policy
    }

    /// Runs `op` until it succeeds, retries are exhausted, or `cancel` fires.
    ///
    /// Returns the last error on exhaustion. A cancellation observed during
    /// a backoff wait returns [`CourierError::Cancelled`].
    pub async fn send<T, F, Fut>(
        &self,
        cancel: &CancellationToken,
        mut op: F,
    ) -> Result<Retried<T>, RetryFailure>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, CourierError>>,
    {
        let mut attempt: u32 = 0;
        loop {
            match op().await {
                Ok(value) => {
                    if attempt > 0 {
                        debug!(retries = attempt, "send succeeded after retry");
                    }
                    return Ok(Retried {
                        value,
                        retry_count: attempt,
                    });
                }
                Err(error) => {
                    let retryable = self
                        .should_retry
                        .as_ref()
                        .is_none_or(|predicate| predicate(&error));
                    if attempt >= self.policy.max_retries || !retryable {
                        return Err(RetryFailure {
                            error,
                            retry_count: attempt,
                        });
                    }

                    let delay = self.policy.delay_for(attempt);
                    warn!(
                        attempt = attempt + 1,
                        max_attempts = self.policy.max_retries + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "send failed, backing off"
                    );

                    tokio::select! {
                        _ = cancel.cancelled() => {
                            return Err(RetryFailure {
                                error: CourierError::Cancelled,
                                retry_count: attempt,
                            });
                        }
                        _ = tokio::time::sleep(delay) => {}
                    }
                    attempt += 1;
                }
            }
        }
    }
}
