// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SLA targets and violation evaluation.

use courier_config::model::SlaConfig;
use serde::{Deserialize, Serialize};
use strum::Display;

/// Violation severity, lowest first.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

/// The metric a violation refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum KpiMetric {
    FirstAttemptSuccessRate,
    OverallDeliveryRate,
    AvgDeliveryTime,
    DistributionWindow,
}

/// One metric that missed its target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlaViolation {
    pub metric: KpiMetric,
    pub severity: Severity,
    pub actual: f64,
    pub target: f64,
    pub message: String,
}

/// Thresholds a run is evaluated against.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SlaTargets {
    /// Minimum first-attempt success rate (0..=1).
    pub first_attempt_success_rate: f64,
    /// Minimum overall delivery rate (0..=1).
    pub overall_delivery_rate: f64,
    pub max_avg_delivery_ms: f64,
    pub max_distribution_minutes: f64,
}

impl Default for SlaTargets {
    fn default() -> Self {
        Self::from(&SlaConfig::default())
    }
}

impl From<&SlaConfig> for SlaTargets {
    fn from(config: &SlaConfig) -> Self {
        Self {
            first_attempt_success_rate: config.first_attempt_success_target,
            overall_delivery_rate: config.overall_delivery_target,
            max_avg_delivery_ms: config.max_avg_delivery_ms,
            max_distribution_minutes: config.max_distribution_minutes,
        }
    }
}

/// Measured values fed into [`evaluate`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Measured {
    pub total_deliveries: u64,
    pub first_attempt_success_rate: f64,
    pub overall_delivery_rate: f64,
    pub avg_delivery_time_ms: f64,
    pub distribution_duration_minutes: f64,
}

/// Checks every metric independently; several violations may fire at once.
///
/// Rate checks are skipped when nothing was delivered.
pub(crate) fn evaluate(measured: &Measured, targets: &SlaTargets) -> Vec<SlaViolation> {
    let mut violations = Vec::new();

    if measured.total_deliveries > 0 {
        if measured.first_attempt_success_rate < targets.first_attempt_success_rate {
            violations.push(SlaViolation {
                metric: KpiMetric::FirstAttemptSuccessRate,
                severity: Severity::High,
                actual: measured.first_attempt_success_rate,
                target: targets.first_attempt_success_rate,
                message: format!(
                    "first-attempt success rate {:.2}% is below target {:.2}%",
                    measured.first_attempt_success_rate * 100.0,
                    targets.first_attempt_success_rate * 100.0
                ),
            });
        }

        if measured.overall_delivery_rate < targets.overall_delivery_rate {
            violations.push(SlaViolation {
                metric: KpiMetric::OverallDeliveryRate,
                severity: Severity::Critical,
                actual: measured.overall_delivery_rate,
                target: targets.overall_delivery_rate,
                message: format!(
                    "overall delivery rate {:.2}% is below target {:.2}%",
                    measured.overall_delivery_rate * 100.0,
                    targets.overall_delivery_rate * 100.0
                ),
            });
        }
    }

    if measured.avg_delivery_time_ms > targets.max_avg_delivery_ms {
        violations.push(SlaViolation {
            metric: KpiMetric::AvgDeliveryTime,
            severity: Severity::Medium,
            actual: measured.avg_delivery_time_ms,
            target: targets.max_avg_delivery_ms,
            message: format!(
                "average delivery time {:.0}ms exceeds target {:.0}ms",
                measured.avg_delivery_time_ms, targets.max_avg_delivery_ms
            ),
        });
    }

    if measured.distribution_duration_minutes > targets.max_distribution_minutes {
        violations.push(SlaViolation {
            metric: KpiMetric::DistributionWindow,
            severity: Severity::Low,
            actual: measured.distribution_duration_minutes,
            target: targets.max_distribution_minutes,
            message: format!(
                "distribution took {:.1} minutes, window is {:.1} minutes",
                measured.distribution_duration_minutes, targets.max_distribution_minutes
            ),
        });
    }

    violations
}
