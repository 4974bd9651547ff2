// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Queue-facing commands: `notify`, `unlock`, `pending`, `failures`.

use std::path::Path;
use std::sync::Arc;

use courier_config::CourierConfig;
use courier_core::CourierError;
use courier_core::persist;
use courier_delivery::{JsonFileReportSink, UnlockOrchestrator, UnlockOutcome, UnlockSettings};
use courier_queue::{ContentBundle, ContentQueue, JsonFileQueueStore};
use tokio_util::sync::CancellationToken;

use crate::run::build_sender;

fn content_queue(config: &CourierConfig) -> ContentQueue {
    ContentQueue::new(Arc::new(JsonFileQueueStore::new(
        config.storage.queue_path(),
    )))
}

fn orchestrator(
    config: &CourierConfig,
    dry_run: bool,
    cancel: CancellationToken,
) -> Result<UnlockOrchestrator, CourierError> {
    let sender = build_sender(config, dry_run)?;
    Ok(
        UnlockOrchestrator::new(sender, content_queue(config), UnlockSettings::from_config(config))
            .with_cancellation(cancel),
    )
}

/// Queues a bundle file and sends its unlock notification.
pub async fn notify(
    config: &CourierConfig,
    recipient: &str,
    bundle_path: &Path,
    dry_run: bool,
    cancel: CancellationToken,
) -> Result<(), CourierError> {
    let bundle: ContentBundle = persist::read_json(bundle_path).await?;
    let orchestrator = orchestrator(config, dry_run, cancel)?;
    let note = orchestrator.send_daily_notification(recipient, bundle).await?;
    println!(
        "queued {} for {recipient} ({} posts), notification {}",
        note.item.id,
        note.item.payload.posts.len(),
        note.message_id
    );
    Ok(())
}

/// Handles an unlock payload or free text as if it came from `recipient`.
pub async fn unlock(
    config: &CourierConfig,
    recipient: &str,
    payload: &str,
    dry_run: bool,
    cancel: CancellationToken,
) -> Result<(), CourierError> {
    let orchestrator = orchestrator(config, dry_run, cancel)?;
    match orchestrator.handle_inbound_text(recipient, payload).await? {
        None => println!("{payload:?} is not an unlock request"),
        Some(UnlockOutcome::NothingPending) => println!("nothing pending for {recipient}"),
        Some(UnlockOutcome::Delivered(summary)) => {
            println!(
                "delivered {} item(s) to {recipient}, {} still pending after errors",
                summary.delivered.len(),
                summary.failed.len()
            );
            for id in &summary.failed {
                println!("  pending: {id}");
            }
        }
    }
    Ok(())
}

/// Lists pending items for one recipient.
pub async fn pending(config: &CourierConfig, recipient: &str) -> Result<(), CourierError> {
    let items = content_queue(config).pending(recipient, None).await?;
    if items.is_empty() {
        println!("nothing pending for {recipient}");
        return Ok(());
    }
    for item in items {
        println!(
            "{}  {}  {} post(s)  queued {}{}",
            item.id,
            item.date,
            item.payload.posts.len(),
            item.queued_at.format("%Y-%m-%d %H:%M:%S"),
            item.linked_trigger_message_id
                .map(|id| format!("  notified {id}"))
                .unwrap_or_default()
        );
    }
    Ok(())
}

/// Prints the failure log.
pub async fn failures(config: &CourierConfig) -> Result<(), CourierError> {
    let sink = JsonFileReportSink::from_config(config);
    let entries = sink.failures().await?;
    if entries.is_empty() {
        println!("failure log is empty");
        return Ok(());
    }
    for entry in entries {
        println!(
            "{}  run {}  {} ({})  {}  [{}] retries={}  {}",
            entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
            entry.run_id,
            entry.recipient_id,
            entry.contact,
            entry.message_kind,
            entry.category,
            entry.retry_count,
            entry.error
        );
    }
    Ok(())
}
