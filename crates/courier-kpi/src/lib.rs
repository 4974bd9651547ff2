// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Delivery KPIs and SLA evaluation for the Courier delivery subsystem.
//!
//! This crate provides:
//! - **KPI monitor**: per-run accumulation of delivery outcomes, latencies, and breaker trips
//! - **SLA evaluation**: independent threshold checks producing severity-ranked violations

pub mod monitor;
pub mod sla;

pub use monitor::{KpiAccumulator, KpiMonitor, KpiReport};
pub use sla::{KpiMetric, Severity, SlaTargets, SlaViolation};
