// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Resilience primitives for the Courier delivery subsystem.
//!
//! - [`classify`]: maps an upstream failure message to an [`ErrorCategory`](courier_core::ErrorCategory)
//! - [`BackoffRetrier`]: exponential backoff with jitter around any async send
//! - [`CircuitBreaker`]: per-run failure-ratio breaker with timed half-open probing

pub mod circuit_breaker;
pub mod classifier;
pub mod retry;

pub use circuit_breaker::{BreakerSettings, BreakerSnapshot, BreakerTrip, CircuitBreaker, CircuitState};
pub use classifier::{classify, classify_error};
pub use retry::{BackoffPolicy, BackoffRetrier, Retried, RetryFailure};
