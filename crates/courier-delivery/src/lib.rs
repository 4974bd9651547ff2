// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Delivery orchestration for Courier.
//!
//! Two independent consumers share the same retried send primitive:
//! - [`DeliveryController`] pushes a batch to every recipient of a run,
//!   guarded by a per-run circuit breaker and measured by a KPI monitor.
//! - [`UnlockOrchestrator`] pulls queued content for one recipient when an
//!   unlock trigger arrives.

pub mod controller;
mod pacing;
pub mod report;
pub mod settings;
pub mod source;
pub mod unlock;

pub use controller::{ControllerState, DeliveryController};
pub use report::{FailureLogEntry, JsonFileReportSink, ReportSink, RunReport, RunStatus};
pub use settings::{DeliverySettings, UnlockSettings};
pub use source::{BatchSource, Manifest, ManifestSource};
pub use unlock::{DeliverySummary, Notification, UnlockOrchestrator, UnlockOutcome, UnlockTrigger};
