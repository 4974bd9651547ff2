// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! File-backed report sink end to end.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use courier_core::{Recipient, RecipientBatch};
use courier_delivery::{
    DeliveryController, DeliverySettings, JsonFileReportSink, ReportSink, RunStatus,
};
use courier_resilience::{BackoffPolicy, BreakerSettings};
use courier_test_utils::MockSender;
use tokio_util::sync::CancellationToken;

fn fast_settings() -> DeliverySettings {
    DeliverySettings {
        backoff: BackoffPolicy {
            max_retries: 1,
            base_delay: Duration::from_millis(1),
            max_jitter: Duration::ZERO,
        },
        recipient_pacing: Duration::ZERO,
        ..DeliverySettings::default()
    }
}

fn batch(id: &str, contact: &str) -> RecipientBatch {
    RecipientBatch::daily(
        Recipient {
            id: id.into(),
            name: id.to_uppercase(),
            contact: contact.into(),
        },
        "Daily brief",
        None,
        None,
    )
}

#[tokio::test]
async fn run_writes_report_failure_log_and_run_log() {
    let dir = tempfile::tempdir().unwrap();
    let sink = Arc::new(JsonFileReportSink::new(
        dir.path().join("reports"),
        dir.path().join("failures.json"),
        dir.path().join("distribution.log"),
    ));
    let sender = Arc::new(MockSender::new());
    sender.fail_always("919800000002", "Recipient phone number not found").await;

    let mut controller = DeliveryController::new(sender, sink.clone(), fast_settings());
    let batches = vec![
        batch("adv-a", "919800000001"),
        batch("adv-b", "919800000002"),
    ];
    let report = controller.run(&batches, &CancellationToken::new()).await;
    assert_eq!(report.status, RunStatus::Completed);

    let report_path = dir.path().join("reports").join(report.file_name());
    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&report_path).unwrap()).unwrap();
    assert_eq!(json["status"], "COMPLETED");
    assert_eq!(json["successful"], 1);
    assert_eq!(json["failed"], 1);
    assert_eq!(json["breaker"]["state"], "CLOSED");
    assert!(json["kpi"]["violations"].as_array().unwrap().len() >= 2);

    let failures = sink.failures().await.unwrap();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].recipient_name, "ADV-B");
    assert_eq!(failures[0].category.to_string(), "PERMANENT");

    let log = std::fs::read_to_string(dir.path().join("distribution.log")).unwrap();
    assert_eq!(log.lines().count(), 1);
    assert!(log.contains(&report.run_id));
    assert!(log.contains("COMPLETED"));
}

#[tokio::test]
async fn failure_log_accumulates_across_runs() {
    let dir = tempfile::tempdir().unwrap();
    let sink = Arc::new(JsonFileReportSink::new(
        dir.path().join("reports"),
        dir.path().join("failures.json"),
        dir.path().join("distribution.log"),
    ));
    let sender = Arc::new(MockSender::new());
    sender.fail_always("919800000001", "network timeout").await;

    let mut controller = DeliveryController::new(sender, sink.clone(), fast_settings());
    let batches = vec![batch("adv-a", "919800000001")];
    let first = controller.run(&batches, &CancellationToken::new()).await;
    let second = controller.run(&batches, &CancellationToken::new()).await;

    let failures = sink.failures().await.unwrap();
    assert_eq!(failures.len(), 2);
    assert_eq!(failures[0].run_id, first.run_id);
    assert_eq!(failures[1].run_id, second.run_id);

    let log = std::fs::read_to_string(dir.path().join("distribution.log")).unwrap();
    assert_eq!(log.lines().count(), 2);
    assert_eq!(std::fs::read_dir(dir.path().join("reports")).unwrap().count(), 2);
}

#[tokio::test]
async fn stored_reports_supply_earlier_breaker_trips() {
    let dir = tempfile::tempdir().unwrap();
    let reports = dir.path().join("reports");
    let sink = Arc::new(JsonFileReportSink::new(
        reports.clone(),
        dir.path().join("failures.json"),
        dir.path().join("distribution.log"),
    ));
    let before = sink.breaker_trips_since(Utc::now()).await.unwrap();
    assert!(before.is_empty());

    let sender = Arc::new(MockSender::new());
    sender.fail_always("919800000001", "network timeout").await;
    let settings = DeliverySettings {
        breaker: BreakerSettings {
            bucket_size: 1,
            ..BreakerSettings::default()
        },
        ..fast_settings()
    };
    let since = Utc::now() - chrono::Duration::minutes(1);
    let mut controller = DeliveryController::new(sender, sink.clone(), settings);
    let report = controller
        .run(&vec![batch("adv-a", "919800000001")], &CancellationToken::new())
        .await;
    assert_eq!(report.kpi.breaker_trips.len(), 1);

    std::fs::write(reports.join("run_broken.json"), "{ not json").unwrap();
    std::fs::write(reports.join("notes.json"), "[]").unwrap();

    let trips = sink.breaker_trips_since(since).await.unwrap();
    assert_eq!(trips, report.kpi.breaker_trips);
    let later = sink
        .breaker_trips_since(Utc::now() + chrono::Duration::minutes(1))
        .await
        .unwrap();
    assert!(later.is_empty());
}
