// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Failure-ratio circuit breaker for a single distribution run.
//!
//! # State transitions
//! ```text
//! Closed   -> Open      failures + successes >= bucket_size and
//!                       failures / (failures + successes) >= threshold
//! Open     -> HalfOpen  first is_open() check at or after next_attempt_at
//! HalfOpen -> Closed    trial send succeeds (counters reset)
//! HalfOpen -> Open      trial send fails
//! ```
//!
//! One breaker belongs to one run. It is never shared between runs, so it
//! needs no interior locking: every mutation goes through `&mut self`.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use strum::Display;
use tokio::time::Instant;
use tracing::{info, warn};

/// Breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitState {
    /// Sends pass through.
    Closed,
    /// Sends are blocked until the cooldown elapses.
    Open,
    /// One trial send is allowed to test recovery.
    HalfOpen,
}

/// Breaker thresholds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BreakerSettings {
    pub failure_threshold: f64,
    /// Minimum outcomes observed before the ratio is evaluated.
    pub bucket_size: u32,
    /// Cooldown between opening and the first trial send.
    pub timeout: Duration,
}

impl Default for BreakerSettings {
    fn default() -> Self {
        Self {
            failure_threshold: 0.20,
            bucket_size: 10,
            timeout: Duration::from_millis(600_000),
        }
    }
}

/// Emitted every time the breaker transitions into `Open`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BreakerTrip {
    pub at: DateTime<Utc>,
    pub failures: u32,
    pub successes: u32,
    /// True when a half-open trial send failed, false for a ratio trip.
    pub from_half_open: bool,
}

/// Serializable view of the breaker for run reports.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BreakerSnapshot {
    pub state: CircuitState,
    pub failures: u32,
    pub successes: u32,
    pub last_failure_time: Option<DateTime<Utc>>,
    /// Remaining cooldown, present only while open.
    pub retry_after_ms: Option<u64>,
}

type TripObserver = Box<dyn Fn(&BreakerTrip) + Send + Sync>;

/// Per-run circuit breaker.
pub struct CircuitBreaker {
    settings: BreakerSettings,
    state: CircuitState,
    failures: u32,
    successes: u32,
    last_failure_time: Option<DateTime<Utc>>,
    /// Set if and only if `state == Open`.
    next_attempt_at: Option<Instant>,
    observers: Vec<TripObserver>,
}

impl std::fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("settings", &self.settings)
            .field("state", &self.state)
            .field("failures", &self.failures)
            .field("successes", &self.successes)
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl CircuitBreaker {
    pub fn new(settings: BreakerSettings) -> Self {
        Self {
            settings,
            state: CircuitState::Closed,
            failures: 0,
            successes: 0,
            last_failure_time: None,
            next_attempt_at: None,
            observers: Vec::new(),
        }
    }

    /// Registers a callback invoked on every transition into `Open`.
    pub fn on_trip<F>(&mut self, observer: F)
    where
        F: Fn(&BreakerTrip) + Send + Sync + 'static,
    {
        self.observers.push(Box::new(observer));
    }

    pub fn state(&self) -> CircuitState {
        self.state
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }

    pub fn successes(&self) -> u32 {
        self.successes
    }

    pub fn last_failure_time(&self) -> Option<DateTime<Utc>> {
        self.last_failure_time
    }

    pub fn next_attempt_at(&self) -> Option<Instant> {
        self.next_attempt_at
    }

    /// Returns true if sends must be blocked.
    ///
    /// An open breaker whose cooldown has elapsed moves to `HalfOpen` first
    /// and reports false, letting exactly the next send act as a trial.
    pub fn is_open(&mut self) -> bool {
        self.is_open_at(Instant::now())
    }

    /// [`is_open`](Self::is_open) against an explicit instant.
    pub fn is_open_at(&mut self, now: Instant) -> bool {
        if self.state == CircuitState::Open
            && self.next_attempt_at.is_some_and(|at| now >= at)
        {
            info!("circuit breaker cooldown elapsed, allowing a trial send");
            self.state = CircuitState::HalfOpen;
            self.next_attempt_at = None;
        }
        self.state == CircuitState::Open
    }

    pub fn record_success(&mut self) {
        self.failures = 0;
        self.successes += 1;
        if self.state == CircuitState::HalfOpen {
            info!("trial send succeeded, closing circuit breaker");
            self.state = CircuitState::Closed;
            self.failures = 0;
            self.successes = 0;
        }
    }

    /// Records a failed send. Returns the trip if this failure opened the breaker.
    pub fn record_failure(&mut self) -> Option<BreakerTrip> {
        self.failures += 1;
        self.last_failure_time = Some(Utc::now());

        match self.state {
            CircuitState::HalfOpen => Some(self.open(true)),
            CircuitState::Closed if self.ratio_exceeded() => Some(self.open(false)),
            _ => None,
        }
    }

    /// Forces `Closed` with zeroed counters.
    pub fn reset(&mut self) {
        self.state = CircuitState::Closed;
        self.failures = 0;
        self.successes = 0;
        self.last_failure_time = None;
        self.next_attempt_at = None;
    }

    pub fn snapshot(&self) -> BreakerSnapshot {
        let now = Instant::now();
        BreakerSnapshot {
            state: self.state,
            failures: self.failures,
            successes: self.successes,
            last_failure_time: self.last_failure_time,
            retry_after_ms: self
                .next_attempt_at
                .map(|at| at.saturating_duration_since(now).as_millis() as u64),
        }
    }

    fn ratio_exceeded(&self) -> bool {
        let total = self.failures + self.successes;
        total >= self.settings.bucket_size
            && f64::from(self.failures) / f64::from(total) >= self.settings.failure_threshold
    }

    fn open(&mut self, from_half_open: bool) -> BreakerTrip {
        self.state = CircuitState::Open;
        self.next_attempt_at = Some(Instant::now() + self.settings.timeout);

        let trip = BreakerTrip {
            at: Utc::now(),
            failures: self.failures,
            successes: self.successes,
            from_half_open,
        };
        warn!(
            failures = trip.failures,
            successes = trip.successes,
            from_half_open,
            cooldown_ms = self.settings.timeout.as_millis() as u64,
            "circuit breaker opened"
        );
        for observer in &self.observers {
            observer(&trip);
        }
        trip
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(BreakerSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn breaker(bucket_size: u32, threshold: f64, timeout_ms: u64) -> CircuitBreaker {
        CircuitBreaker::new(BreakerSettings {
            failure_threshold: threshold,
            bucket_size,
            timeout: Duration::from_millis(timeout_ms),
        })
    }

    fn counting(breaker: &mut CircuitBreaker) -> Arc<AtomicUsize> {
        let trips = Arc::new(AtomicUsize::new(0));
        let counter = trips.clone();
        breaker.on_trip(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        trips
    }

    #[test]
    fn small_sample_does_not_trip() {
        let mut cb = breaker(10, 0.2, 1000);
        assert!(cb.record_failure().is_none());
        assert!(cb.record_failure().is_none());
        assert_eq!(cb.state(), CircuitState::Closed);
        assert!(cb.next_attempt_at().is_none());
    }

    #[test]
    fn eight_successes_two_failures_trips_at_bucket() {
        let mut cb = breaker(10, 0.2, 1000);
        let trips = counting(&mut cb);
        for _ in 0..8 {
            cb.record_success();
        }
        assert!(cb.record_failure().is_none());
        let trip = cb.record_failure().expect("should trip");
        assert!(!trip.from_half_open);
        assert_eq!(trip.failures, 2);
        assert_eq!(trip.successes, 8);
        assert_eq!(cb.state(), CircuitState::Open);
        assert!(cb.next_attempt_at().is_some());
        assert!(cb.is_open());
        assert_eq!(trips.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn success_resets_failure_streak() {
        let mut cb = breaker(4, 0.5, 1000);
        cb.record_failure();
        cb.record_success();
        assert_eq!(cb.failures(), 0);
        assert_eq!(cb.successes(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn open_until_timeout_then_half_open() {
        let mut cb = breaker(2, 0.2, 600_000);
        cb.record_success();
        cb.record_failure().expect("1/2 >= 0.2 trips");

        tokio::time::advance(Duration::from_millis(599_999)).await;
        assert!(cb.is_open());
        assert_eq!(cb.state(), CircuitState::Open);

        tokio::time::advance(Duration::from_millis(1)).await;
        assert!(!cb.is_open());
        assert_eq!(cb.state(), CircuitState::HalfOpen);
        assert!(cb.next_attempt_at().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn half_open_failure_reopens() {
        let mut cb = breaker(1, 0.2, 1000);
        let trips = counting(&mut cb);
        cb.record_failure().expect("trips");
        tokio::time::advance(Duration::from_millis(1000)).await;
        assert!(!cb.is_open());

        let trip = cb.record_failure().expect("failed trial reopens");
        assert!(trip.from_half_open);
        assert_eq!(cb.state(), CircuitState::Open);
        assert!(cb.is_open());
        assert_eq!(trips.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn half_open_success_closes_with_zeroed_counters() {
        let mut cb = breaker(1, 0.2, 1000);
        cb.record_failure().expect("trips");
        tokio::time::advance(Duration::from_millis(1000)).await;
        assert!(!cb.is_open());

        cb.record_success();
        assert_eq!(cb.state(), CircuitState::Closed);
        assert_eq!(cb.failures(), 0);
        assert_eq!(cb.successes(), 0);
    }

    #[test]
    fn reset_forces_closed() {
        let mut cb = breaker(1, 0.2, 1000);
        cb.record_failure();
        assert_eq!(cb.state(), CircuitState::Open);
        cb.reset();
        assert_eq!(cb.state(), CircuitState::Closed);
        assert_eq!(cb.failures(), 0);
        assert!(cb.next_attempt_at().is_none());
        assert!(!cb.is_open());
    }

    #[test]
    fn failures_while_open_do_not_retrip() {
        let mut cb = breaker(1, 0.2, 60_000);
        let trips = counting(&mut cb);
        cb.record_failure();
        assert!(cb.record_failure().is_none());
        assert_eq!(trips.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn snapshot_reports_cooldown_only_when_open() {
        let mut cb = breaker(1, 0.2, 60_000);
        assert!(cb.snapshot().retry_after_ms.is_none());
        cb.record_failure();
        let snap = cb.snapshot();
        assert_eq!(snap.state, CircuitState::Open);
        assert!(snap.retry_after_ms.is_some());
        assert!(snap.last_failure_time.is_some());
    }

    proptest! {
        #[test]
        fn successes_then_failures_over_threshold_trip_exactly_once(
            bucket in 1u32..30,
            threshold in 0.01f64..=1.0,
            failures_pick in 0u32..30,
        ) {
            let failures = 1 + failures_pick % bucket;
            prop_assume!(f64::from(failures) / f64::from(bucket) >= threshold);
            let successes = bucket - failures;

            let mut cb = breaker(bucket, threshold, 60_000);
            let trips = counting(&mut cb);
            for _ in 0..successes {
                cb.record_success();
            }
            for _ in 0..failures {
                cb.record_failure();
            }

            prop_assert_eq!(cb.state(), CircuitState::Open);
            prop_assert_eq!(trips.load(Ordering::SeqCst), 1);
            prop_assert!(cb.is_open());
        }

        #[test]
        fn ratio_below_threshold_never_trips(
            bucket in 2u32..30,
            threshold in 0.05f64..=1.0,
            failures_pick in 0u32..30,
        ) {
            let failures = failures_pick % bucket;
            prop_assume!(f64::from(failures) / f64::from(bucket) < threshold);

            let mut cb = breaker(bucket, threshold, 60_000);
            for _ in 0..(bucket - failures) {
                cb.record_success();
            }
            for _ in 0..failures {
                cb.record_failure();
            }
            prop_assert_eq!(cb.state(), CircuitState::Closed);
        }
    }
}
