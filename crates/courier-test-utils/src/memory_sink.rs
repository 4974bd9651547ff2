// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory [`ReportSink`] with optional injected write failures.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use courier_core::CourierError;
use courier_delivery::{FailureLogEntry, ReportSink, RunReport};

#[derive(Debug, Default)]
pub struct MemoryReportSink {
    reports: Mutex<Vec<RunReport>>,
    failures: Mutex<Vec<FailureLogEntry>>,
    run_log: Mutex<Vec<String>>,
    fail_failure_log: Mutex<bool>,
}

impl MemoryReportSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every `append_failure` call return a storage error.
    pub async fn break_failure_log(&self) {
        *self.fail_failure_log.lock().await = true;
    }

    pub async fn reports(&self) -> Vec<RunReport> {
        self.reports.lock().await.clone()
    }

    pub async fn failures(&self) -> Vec<FailureLogEntry> {
        self.failures.lock().await.clone()
    }

    pub async fn run_log(&self) -> Vec<String> {
        self.run_log.lock().await.clone()
    }
}

#[async_trait]
impl ReportSink for MemoryReportSink {
    async fn write_report(&self, report: &RunReport) -> Result<(), CourierError> {
        self.reports.lock().await.push(report.clone());
        Ok(())
    }

    async fn append_failure(&self, entry: &FailureLogEntry) -> Result<(), CourierError> {
        if *self.fail_failure_log.lock().await {
            return Err(CourierError::Storage {
                source: Box::new(std::io::Error::other("failure log unavailable")),
            });
        }
        self.failures.lock().await.push(entry.clone());
        Ok(())
    }

    async fn append_run_log(&self, line: &str) -> Result<(), CourierError> {
        self.run_log.lock().await.push(line.to_string());
        Ok(())
    }

    async fn breaker_trips_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<DateTime<Utc>>, CourierError> {
        Ok(self
            .reports
            .lock()
            .await
            .iter()
            .flat_map(|r| r.kpi.breaker_trips.iter().copied())
            .filter(|t| *t >= since)
            .collect())
    }
}
