// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Run reports, the failure log, and the sinks that persist them.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use courier_core::persist;
use courier_core::{CourierError, ErrorCategory, MessageKind};
use courier_kpi::{KpiReport, SlaViolation};
use courier_resilience::BreakerSnapshot;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Terminal state of a distribution run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    Completed,
    /// An error escaped the recipient loop.
    Failed { error: String },
    Cancelled,
}

impl RunStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Completed => "COMPLETED",
            Self::Failed { .. } => "FAILED",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// Failed or cancelled.
    pub fn is_aborted(&self) -> bool {
        !matches!(self, Self::Completed)
    }
}

/// Persisted summary of one distribution run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    #[serde(flatten)]
    pub status: RunStatus,
    pub total_recipients: usize,
    pub successful: usize,
    pub failed: usize,
    pub skipped: usize,
    /// `successful / total_recipients`, 0 when there were none.
    pub success_rate: f64,
    /// Mean retries over every recorded message attempt.
    pub average_retries: f64,
    pub breaker: BreakerSnapshot,
    pub kpi: KpiReport,
}

impl RunReport {
    pub fn violations(&self) -> &[SlaViolation] {
        &self.kpi.violations
    }

    pub fn sla_compliant(&self) -> bool {
        self.kpi.sla_compliant
    }

    /// File name under the reports directory.
    pub fn file_name(&self) -> String {
        format!(
            "run_{}_{}.json",
            self.started_at.format("%Y%m%d_%H%M%S"),
            self.run_id
        )
    }

    /// One human-readable line for the distribution log.
    pub fn log_line(&self) -> String {
        let mut line = format!(
            "{} run {} {}: {}/{} delivered, {} failed, {} skipped, first-attempt {:.1}%, avg {:.0}ms, {} SLA violation(s)",
            self.ended_at.to_rfc3339(),
            self.run_id,
            self.status.label(),
            self.successful,
            self.total_recipients,
            self.failed,
            self.skipped,
            self.kpi.first_attempt_success_rate * 100.0,
            self.kpi.avg_delivery_time_ms,
            self.kpi.violations.len(),
        );
        if let RunStatus::Failed { error } = &self.status {
            line.push_str(&format!(" [error: {error}]"));
        }
        line
    }
}

/// A recipient that still failed after all retries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureLogEntry {
    pub timestamp: DateTime<Utc>,
    pub run_id: String,
    pub recipient_id: String,
    #[serde(default)]
    pub recipient_name: String,
    pub contact: String,
    pub message_kind: MessageKind,
    pub error: String,
    pub category: ErrorCategory,
    pub retry_count: u32,
    pub needs_manual_followup: bool,
}

/// Destination for run reports and failure records.
#[async_trait]
pub trait ReportSink: Send + Sync + 'static {
    async fn write_report(&self, report: &RunReport) -> Result<(), CourierError>;

    async fn append_failure(&self, entry: &FailureLogEntry) -> Result<(), CourierError>;

    async fn append_run_log(&self, line: &str) -> Result<(), CourierError>;

    /// Breaker trips recorded by earlier runs at or after `since`.
    async fn breaker_trips_since(
        &self,
        _since: DateTime<Utc>,
    ) -> Result<Vec<DateTime<Utc>>, CourierError> {
        Ok(Vec::new())
    }
}

/// The part of a stored run report needed to rebuild trip history.
#[derive(Deserialize)]
struct StoredReport {
    kpi: StoredKpi,
}

#[derive(Deserialize)]
struct StoredKpi {
    #[serde(default)]
    breaker_trips: Vec<DateTime<Utc>>,
}

/// Writes reports and logs as files on disk.
///
/// - `reports_dir/run_<YYYYMMDD_HHMMSS>_<run-id>.json`: one document per run
/// - `failure_log`: a JSON array, rewritten whole on every append
/// - `run_log`: append-only text, one line per run
#[derive(Debug)]
pub struct JsonFileReportSink {
    reports_dir: PathBuf,
    failure_log: PathBuf,
    run_log: PathBuf,
    failure_lock: Mutex<()>,
}

impl JsonFileReportSink {
    pub fn new(
        reports_dir: impl Into<PathBuf>,
        failure_log: impl Into<PathBuf>,
        run_log: impl Into<PathBuf>,
    ) -> Self {
        Self {
            reports_dir: reports_dir.into(),
            failure_log: failure_log.into(),
            run_log: run_log.into(),
            failure_lock: Mutex::new(()),
        }
    }

    pub fn from_config(config: &courier_config::CourierConfig) -> Self {
        Self::new(
            config.storage.reports_path(),
            config.storage.failure_log(),
            config.storage.run_log(),
        )
    }

    pub fn reports_dir(&self) -> &Path {
        &self.reports_dir
    }

    /// Reads the failure log back, oldest first.
    pub async fn failures(&self) -> Result<Vec<FailureLogEntry>, CourierError> {
        let _guard = self.failure_lock.lock().await;
        persist::read_json_or_default(&self.failure_log).await
    }
}

#[async_trait]
impl ReportSink for JsonFileReportSink {
    async fn write_report(&self, report: &RunReport) -> Result<(), CourierError> {
        let path = self.reports_dir.join(report.file_name());
        persist::write_json_atomic(&path, report).await?;
        debug!(path = %path.display(), "run report written");
        Ok(())
    }

    async fn append_failure(&self, entry: &FailureLogEntry) -> Result<(), CourierError> {
        let _guard = self.failure_lock.lock().await;
        let mut entries: Vec<FailureLogEntry> =
            persist::read_json_or_default(&self.failure_log).await?;
        entries.push(entry.clone());
        persist::write_json_atomic(&self.failure_log, &entries).await?;
        debug!(
            recipient = %entry.recipient_id,
            total = entries.len(),
            "failure log appended"
        );
        Ok(())
    }

    async fn append_run_log(&self, line: &str) -> Result<(), CourierError> {
        if let Some(parent) = self.run_log.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.run_log)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.write_all(b"\n").await?;
        file.flush().await?;
        Ok(())
    }

    async fn breaker_trips_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<DateTime<Utc>>, CourierError> {
        let mut dir = match tokio::fs::read_dir(&self.reports_dir).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut trips = Vec::new();
        while let Some(entry) = dir.next_entry().await? {
            let path = entry.path();
            let is_report = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with("run_") && n.ends_with(".json"));
            if !is_report {
                continue;
            }
            match persist::read_json::<StoredReport>(&path).await {
                Ok(report) => trips.extend(
                    report
                        .kpi
                        .breaker_trips
                        .into_iter()
                        .filter(|t| *t >= since),
                ),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping unreadable run report");
                }
            }
        }
        trips.sort();
        Ok(trips)
    }
}
