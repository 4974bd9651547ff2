// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Push distribution over a recipient set.
//!
//! A run walks the recipients in order. For each one it consults the
//! run's circuit breaker, sends the batch messages through the backoff
//! retrier, and feeds every outcome to the breaker and the KPI monitor.
//! Message failures are recorded, never thrown; only an error escaping the
//! loop (source load, sink write, cancellation) ends the run early.

use std::sync::Arc;

use chrono::{DateTime, Datelike, Utc};
use courier_core::{
    CourierError, DeliveryAttempt, ErrorCategory, MessageSender, RecipientBatch,
};
use courier_kpi::KpiMonitor;
use courier_resilience::{BackoffRetrier, BreakerTrip, CircuitBreaker, classify_error};
use strum::Display;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::pacing::pause;
use crate::report::{FailureLogEntry, ReportSink, RunReport, RunStatus};
use crate::settings::DeliverySettings;
use crate::source::BatchSource;

/// Lifecycle of the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ControllerState {
    Idle,
    Running,
    Completed,
    Failed,
    Cancelled,
}

/// Recipient-level counters for one run.
#[derive(Debug, Default)]
struct Tally {
    total: usize,
    successful: usize,
    failed: usize,
    skipped: usize,
    attempts: u64,
    retries: u64,
}

/// State owned by a single run; never shared between runs.
struct RunContext {
    run_id: String,
    breaker: CircuitBreaker,
    /// Fed by the breaker's trip observer.
    trips: mpsc::UnboundedReceiver<BreakerTrip>,
    kpi: KpiMonitor,
    tally: Tally,
}

impl RunContext {
    fn record(&mut self, attempt: DeliveryAttempt) {
        self.tally.attempts += 1;
        self.tally.retries += u64::from(attempt.retry_count);
        self.kpi.record_delivery(&attempt);
    }

    fn record_trips(&mut self) {
        while let Ok(trip) = self.trips.try_recv() {
            self.kpi.record_circuit_breaker_trip_at(trip.at);
        }
    }
}

/// Orchestrates distribution runs.
pub struct DeliveryController {
    sender: Arc<dyn MessageSender>,
    sink: Arc<dyn ReportSink>,
    settings: DeliverySettings,
    retrier: BackoffRetrier,
    state: ControllerState,
}

impl std::fmt::Debug for DeliveryController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeliveryController")
            .field("sender", &self.sender.name())
            .field("settings", &self.settings)
            .field("state", &self.state)
            .finish()
    }
}

impl DeliveryController {
    pub fn new(
        sender: Arc<dyn MessageSender>,
        sink: Arc<dyn ReportSink>,
        settings: DeliverySettings,
    ) -> Self {
        Self {
            retrier: settings.retrier(),
            sender,
            sink,
            settings,
            state: ControllerState::Idle,
        }
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn settings(&self) -> &DeliverySettings {
        &self.settings
    }

    /// Runs one distribution over the batches from `source`.
    ///
    /// Always returns a report; aborted runs carry a `Failed` or `Cancelled`
    /// status. The report, a run-log line, and failure-log entries go to the
    /// configured [`ReportSink`].
    pub async fn run(&mut self, source: &dyn BatchSource, cancel: &CancellationToken) -> RunReport {
        let run_id = new_run_id();
        let started_at = Utc::now();
        self.state = ControllerState::Running;
        info!(run_id = %run_id, sender = self.sender.name(), "distribution run started");

        let prior_trips = self.trips_this_month(started_at).await;
        let (trip_tx, trips) = mpsc::unbounded_channel();
        let mut breaker = CircuitBreaker::new(self.settings.breaker);
        breaker.on_trip(move |trip| {
            let _ = trip_tx.send(trip.clone());
        });
        let mut run = RunContext {
            run_id,
            breaker,
            trips,
            kpi: KpiMonitor::new(self.settings.sla).with_prior_trips(prior_trips),
            tally: Tally::default(),
        };
        run.kpi.start_run_at(started_at);

        let outcome = self.process(source, cancel, &mut run).await;

        let ended_at = Utc::now();
        let kpi = run.kpi.end_run_at(ended_at);
        let status = match outcome {
            Ok(()) => RunStatus::Completed,
            Err(e) if e.is_cancelled() => {
                warn!(run_id = %run.run_id, "distribution run cancelled");
                RunStatus::Cancelled
            }
            Err(e) => {
                error!(run_id = %run.run_id, error = %e, "distribution run aborted");
                RunStatus::Failed {
                    error: e.to_string(),
                }
            }
        };

        let tally = &run.tally;
        let mut report = RunReport {
            run_id: run.run_id.clone(),
            started_at,
            ended_at,
            status,
            total_recipients: tally.total,
            successful: tally.successful,
            failed: tally.failed,
            skipped: tally.skipped,
            success_rate: ratio(tally.successful as u64, tally.total as u64),
            average_retries: ratio(tally.retries, tally.attempts),
            breaker: run.breaker.snapshot(),
            kpi,
        };

        if let Err(e) = self.persist(&report).await {
            error!(run_id = %report.run_id, error = %e, "failed to persist run report");
            if !report.status.is_aborted() {
                report.status = RunStatus::Failed {
                    error: format!("failed to persist run report: {e}"),
                };
            }
        }

        self.state = match report.status {
            RunStatus::Completed => ControllerState::Completed,
            RunStatus::Failed { .. } => ControllerState::Failed,
            RunStatus::Cancelled => ControllerState::Cancelled,
        };

        info!(
            run_id = %report.run_id,
            status = report.status.label(),
            successful = report.successful,
            failed = report.failed,
            skipped = report.skipped,
            sla_compliant = report.sla_compliant(),
            "distribution run finished"
        );
        report
    }

    async fn process(
        &self,
        source: &dyn BatchSource,
        cancel: &CancellationToken,
        run: &mut RunContext,
    ) -> Result<(), CourierError> {
        let batches = source.load().await?;
        run.tally.total = batches.len();
        info!(run_id = %run.run_id, recipients = batches.len(), "recipients loaded");

        let last = batches.len().saturating_sub(1);
        for (idx, batch) in batches.iter().enumerate() {
            if cancel.is_cancelled() {
                return Err(CourierError::Cancelled);
            }

            let recipient = &batch.recipient;
            if run.breaker.is_open() {
                run.tally.skipped += 1;
                warn!(
                    run_id = %run.run_id,
                    recipient = %recipient.id,
                    "circuit breaker open, skipping recipient"
                );
                continue;
            }

            match self.deliver_batch(batch, cancel, run).await? {
                None => {
                    run.tally.successful += 1;
                    info!(run_id = %run.run_id, recipient = %recipient.id, "recipient delivered");
                }
                Some(failure) => {
                    run.tally.failed += 1;
                    self.sink.append_failure(&failure).await?;
                }
            }

            if idx < last {
                pause(cancel, self.settings.recipient_pacing).await?;
            }
        }
        Ok(())
    }

    /// Sends every message of `batch` in order.
    ///
    /// Returns the failure-log entry for the first failed message, or `None`
    /// when all messages went through.
    async fn deliver_batch(
        &self,
        batch: &RecipientBatch,
        cancel: &CancellationToken,
        run: &mut RunContext,
    ) -> Result<Option<FailureLogEntry>, CourierError> {
        let recipient = &batch.recipient;
        let mut first_failure = None;

        for message in &batch.messages {
            let kind = message.kind();
            let started = Instant::now();
            let result = self
                .retrier
                .send(cancel, || self.sender.send(&recipient.contact, message))
                .await;
            let elapsed_ms = started.elapsed().as_millis() as u64;

            match result {
                Ok(sent) => {
                    run.breaker.record_success();
                    run.record(DeliveryAttempt::succeeded(
                        &recipient.id,
                        kind,
                        sent.retry_count,
                        elapsed_ms,
                    ));
                    debug!(
                        recipient = %recipient.id,
                        kind = %kind,
                        message_id = %sent.value,
                        retries = sent.retry_count,
                        elapsed_ms,
                        "message sent"
                    );
                }
                Err(failure) if failure.error.is_cancelled() => {
                    return Err(CourierError::Cancelled);
                }
                Err(failure) => {
                    let category = classify_error(&failure.error);
                    let upstream = failure.error.upstream_message();

                    run.breaker.record_failure();
                    run.record_trips();
                    run.record(DeliveryAttempt::failed(
                        &recipient.id,
                        kind,
                        failure.retry_count,
                        elapsed_ms,
                        category,
                    ));

                    if category == ErrorCategory::Systemic {
                        error!(
                            recipient = %recipient.id,
                            error = %upstream,
                            "systemic send failure, affects all subsequent sends"
                        );
                    } else {
                        warn!(
                            recipient = %recipient.id,
                            kind = %kind,
                            category = %category,
                            retries = failure.retry_count,
                            error = %upstream,
                            "message failed after retries"
                        );
                    }

                    first_failure.get_or_insert_with(|| FailureLogEntry {
                        timestamp: Utc::now(),
                        run_id: run.run_id.clone(),
                        recipient_id: recipient.id.clone(),
                        recipient_name: recipient.name.clone(),
                        contact: recipient.contact.clone(),
                        message_kind: kind,
                        error: upstream,
                        category,
                        retry_count: failure.retry_count,
                        needs_manual_followup: true,
                    });
                }
            }
        }
        Ok(first_failure)
    }

    /// Trips of earlier runs in the calendar month of `now`; empty if unreadable.
    async fn trips_this_month(&self, now: DateTime<Utc>) -> Vec<DateTime<Utc>> {
        let month_start = now
            .date_naive()
            .with_day(1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|d| d.and_utc())
            .unwrap_or(now);
        match self.sink.breaker_trips_since(month_start).await {
            Ok(trips) => trips,
            Err(e) => {
                warn!(error = %e, "could not read earlier breaker trips, counting this run only");
                Vec::new()
            }
        }
    }

    async fn persist(&self, report: &RunReport) -> Result<(), CourierError> {
        self.sink.write_report(report).await?;
        self.sink.append_run_log(&report.log_line()).await
    }
}

fn new_run_id() -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    id.chars().take(12).collect()
}

fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_ids_are_short_hex() {
        let id = new_run_id();
        assert_eq!(id.len(), 12);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(id, new_run_id());
    }

    #[test]
    fn ratio_handles_empty_denominator() {
        assert_eq!(ratio(0, 0), 0.0);
        assert_eq!(ratio(1, 4), 0.25);
    }

    #[test]
    fn controller_state_display() {
        assert_eq!(ControllerState::Cancelled.to_string(), "CANCELLED");
    }

    struct NullSink;

    #[async_trait::async_trait]
    impl ReportSink for NullSink {
        async fn write_report(&self, _: &RunReport) -> Result<(), CourierError> {
            Ok(())
        }
        async fn append_failure(&self, _: &FailureLogEntry) -> Result<(), CourierError> {
            Ok(())
        }
        async fn append_run_log(&self, _: &str) -> Result<(), CourierError> {
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    #[tracing_test::traced_test]
    async fn invalid_token_is_permanent_not_systemic() {
        use courier_core::Recipient;
        use courier_test_utils::MockSender;

        let sender = Arc::new(MockSender::new());
        sender.fail_always("919800000001", "Invalid OAuth access token").await;
        let mut controller =
            DeliveryController::new(sender.clone(), Arc::new(NullSink), DeliverySettings::default());

        let batches = vec![
            RecipientBatch::daily(
                Recipient {
                    id: "adv-a".into(),
                    name: String::new(),
                    contact: "919800000001".into(),
                },
                "brief",
                None,
                None,
            ),
            RecipientBatch::daily(
                Recipient {
                    id: "adv-b".into(),
                    name: String::new(),
                    contact: "919800000002".into(),
                },
                "brief",
                None,
                None,
            ),
        ];
        let report = controller.run(&batches, &CancellationToken::new()).await;

        // "Invalid" wins over "token": the first rule is PERMANENT.
        assert_eq!(report.failed, 1);
        assert_eq!(report.successful, 1);
        assert!(!logs_contain("systemic send failure"));
    }

    #[tokio::test(start_paused = true)]
    #[tracing_test::traced_test]
    async fn auth_failure_is_logged_as_systemic() {
        use courier_core::Recipient;
        use courier_test_utils::MockSender;

        let sender = Arc::new(MockSender::new());
        sender.fail_always("919800000001", "Authentication failed").await;
        let mut controller =
            DeliveryController::new(sender.clone(), Arc::new(NullSink), DeliverySettings::default());

        let batches = vec![RecipientBatch::daily(
            Recipient {
                id: "adv-a".into(),
                name: String::new(),
                contact: "919800000001".into(),
            },
            "brief",
            None,
            None,
        )];
        let report = controller.run(&batches, &CancellationToken::new()).await;

        assert_eq!(report.failed, 1);
        assert_eq!(report.status, RunStatus::Completed);
        assert!(logs_contain("systemic send failure"));
    }
}
