// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-run KPI accumulation.
//!
//! A [`KpiMonitor`] is created for one distribution run, reset by
//! `start_run`, fed every [`DeliveryAttempt`] and breaker trip, and closed by
//! `end_run`, which derives an immutable [`KpiReport`]. Trips from earlier
//! runs are supplied through [`KpiMonitor::with_prior_trips`] so the monthly
//! trip count spans runs.

use chrono::{DateTime, Datelike, Utc};
use courier_core::DeliveryAttempt;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::sla::{self, Measured, SlaTargets, SlaViolation};

/// Raw counters for one run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KpiAccumulator {
    pub total_deliveries: u64,
    pub first_attempt_successes: u64,
    pub retried_successes: u64,
    pub total_failures: u64,
    /// Append-only latencies in milliseconds.
    pub delivery_times: Vec<u64>,
    pub circuit_breaker_trips: Vec<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl KpiAccumulator {
    pub fn first_attempt_success_rate(&self) -> f64 {
        ratio(self.first_attempt_successes, self.total_deliveries)
    }

    pub fn overall_delivery_rate(&self) -> f64 {
        ratio(
            self.first_attempt_successes + self.retried_successes,
            self.total_deliveries,
        )
    }

    pub fn avg_delivery_time_ms(&self) -> f64 {
        if self.delivery_times.is_empty() {
            return 0.0;
        }
        let sum: u64 = self.delivery_times.iter().sum();
        sum as f64 / self.delivery_times.len() as f64
    }

    /// Run length in minutes; uses `now` while the run is still open.
    pub fn distribution_duration_minutes(&self) -> f64 {
        match self.started_at {
            Some(start) => {
                let end = self.ended_at.unwrap_or_else(Utc::now);
                (end - start).num_milliseconds().max(0) as f64 / 60_000.0
            }
            None => 0.0,
        }
    }

    /// Trips that fall in the same calendar month as `reference`.
    pub fn trips_in_month_of(&self, reference: DateTime<Utc>) -> usize {
        self.circuit_breaker_trips
            .iter()
            .filter(|t| same_month(**t, reference))
            .count()
    }
}

fn same_month(a: DateTime<Utc>, b: DateTime<Utc>) -> bool {
    a.year() == b.year() && a.month() == b.month()
}

fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

/// Immutable summary derived at the end of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpiReport {
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: DateTime<Utc>,
    pub total_deliveries: u64,
    pub first_attempt_successes: u64,
    pub retried_successes: u64,
    pub total_failures: u64,
    pub first_attempt_success_rate: f64,
    pub overall_delivery_rate: f64,
    pub avg_delivery_time_ms: f64,
    pub distribution_duration_minutes: f64,
    /// Trip timestamps recorded during this run.
    #[serde(default)]
    pub breaker_trips: Vec<DateTime<Utc>>,
    /// Trips in the calendar month of `ended_at`, earlier runs included.
    pub breaker_trips_this_month: usize,
    pub targets: SlaTargets,
    pub violations: Vec<SlaViolation>,
    pub sla_compliant: bool,
}

/// Accumulates delivery outcomes for one run and evaluates them against SLA targets.
#[derive(Debug, Clone)]
pub struct KpiMonitor {
    targets: SlaTargets,
    acc: KpiAccumulator,
    /// Trips from earlier runs; survives `start_run`.
    prior_trips: Vec<DateTime<Utc>>,
}

impl KpiMonitor {
    pub fn new(targets: SlaTargets) -> Self {
        Self {
            targets,
            acc: KpiAccumulator::default(),
            prior_trips: Vec::new(),
        }
    }

    /// Seeds the trip history of earlier runs.
    pub fn with_prior_trips(mut self, trips: Vec<DateTime<Utc>>) -> Self {
        self.prior_trips = trips;
        self
    }

    /// Trips in the calendar month of `reference`, earlier runs included.
    pub fn trips_in_month_of(&self, reference: DateTime<Utc>) -> usize {
        let prior = self
            .prior_trips
            .iter()
            .filter(|t| same_month(**t, reference))
            .count();
        prior + self.acc.trips_in_month_of(reference)
    }

    pub fn targets(&self) -> &SlaTargets {
        &self.targets
    }

    /// Current counters (for live reporting and tests).
    pub fn accumulator(&self) -> &KpiAccumulator {
        &self.acc
    }

    /// Clears all counters and stamps the start time. Trips of the previous
    /// run move into the history.
    pub fn start_run(&mut self) {
        self.start_run_at(Utc::now());
    }

    pub fn start_run_at(&mut self, at: DateTime<Utc>) {
        let finished = std::mem::take(&mut self.acc.circuit_breaker_trips);
        self.prior_trips.extend(finished);
        self.acc = KpiAccumulator {
            started_at: Some(at),
            ..KpiAccumulator::default()
        };
    }

    pub fn record_delivery(&mut self, attempt: &DeliveryAttempt) {
        self.acc.total_deliveries += 1;
        if attempt.success {
            if attempt.retry_count == 0 {
                self.acc.first_attempt_successes += 1;
            } else {
                self.acc.retried_successes += 1;
            }
        } else {
            self.acc.total_failures += 1;
        }
        self.acc.delivery_times.push(attempt.delivery_time_ms);
    }

    pub fn record_circuit_breaker_trip(&mut self) {
        self.record_circuit_breaker_trip_at(Utc::now());
    }

    pub fn record_circuit_breaker_trip_at(&mut self, at: DateTime<Utc>) {
        self.acc.circuit_breaker_trips.push(at);
    }

    pub fn first_attempt_success_rate(&self) -> f64 {
        self.acc.first_attempt_success_rate()
    }

    pub fn overall_delivery_rate(&self) -> f64 {
        self.acc.overall_delivery_rate()
    }

    /// Closes the run and derives its report.
    pub fn end_run(&mut self) -> KpiReport {
        self.end_run_at(Utc::now())
    }

    pub fn end_run_at(&mut self, at: DateTime<Utc>) -> KpiReport {
        self.acc.ended_at = Some(at);
        let acc = &self.acc;

        let measured = Measured {
            total_deliveries: acc.total_deliveries,
            first_attempt_success_rate: acc.first_attempt_success_rate(),
            overall_delivery_rate: acc.overall_delivery_rate(),
            avg_delivery_time_ms: acc.avg_delivery_time_ms(),
            distribution_duration_minutes: acc.distribution_duration_minutes(),
        };
        let violations = sla::evaluate(&measured, &self.targets);

        for violation in &violations {
            warn!(
                metric = %violation.metric,
                severity = %violation.severity,
                actual = violation.actual,
                target = violation.target,
                "SLA violation: {}",
                violation.message
            );
        }
        info!(
            deliveries = acc.total_deliveries,
            first_attempt_rate = measured.first_attempt_success_rate,
            overall_rate = measured.overall_delivery_rate,
            avg_ms = measured.avg_delivery_time_ms,
            violations = violations.len(),
            "KPI run closed"
        );

        KpiReport {
            started_at: acc.started_at,
            ended_at: at,
            total_deliveries: acc.total_deliveries,
            first_attempt_successes: acc.first_attempt_successes,
            retried_successes: acc.retried_successes,
            total_failures: acc.total_failures,
            first_attempt_success_rate: measured.first_attempt_success_rate,
            overall_delivery_rate: measured.overall_delivery_rate,
            avg_delivery_time_ms: measured.avg_delivery_time_ms,
            distribution_duration_minutes: measured.distribution_duration_minutes,
            breaker_trips: acc.circuit_breaker_trips.clone(),
            breaker_trips_this_month: self.trips_in_month_of(at),
            targets: self.targets,
            sla_compliant: violations.is_empty(),
            violations,
        }
    }
}

impl Default for KpiMonitor {
    fn default() -> Self {
        Self::new(SlaTargets::default())
    }
}
