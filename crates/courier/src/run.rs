// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `courier run`: one distribution run over the manifest.

use std::path::PathBuf;
use std::sync::Arc;

use courier_config::CourierConfig;
use courier_core::{CourierError, MessageSender};
use courier_delivery::{
    DeliveryController, DeliverySettings, JsonFileReportSink, ManifestSource, RunReport, RunStatus,
};
use courier_whatsapp::WhatsAppSender;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::dry_run::LogSender;

/// Picks the live WhatsApp transport, or the logging one for dry runs.
pub fn build_sender(
    config: &CourierConfig,
    dry_run: bool,
) -> Result<Arc<dyn MessageSender>, CourierError> {
    if dry_run {
        return Ok(Arc::new(LogSender::new()));
    }
    Ok(Arc::new(WhatsAppSender::from_config(&config.whatsapp)?))
}

/// Runs the distribution and returns the process exit code.
pub async fn run_distribution(
    config: &CourierConfig,
    manifest: Option<PathBuf>,
    dry_run: bool,
    cancel: CancellationToken,
) -> Result<i32, CourierError> {
    let sender = build_sender(config, dry_run)?;
    let sink = Arc::new(JsonFileReportSink::from_config(config));
    let source = ManifestSource::new(manifest.unwrap_or_else(|| config.storage.manifest()));

    let mut controller =
        DeliveryController::new(sender, sink, DeliverySettings::from_config(config));
    let report = controller.run(&source, &cancel).await;

    print_summary(&report);
    Ok(exit_code(&report))
}

/// 0 for completed runs (violations only warn), 1 for aborted ones.
pub fn exit_code(report: &RunReport) -> i32 {
    match &report.status {
        RunStatus::Completed => {
            if !report.sla_compliant() {
                warn!(
                    violations = report.violations().len(),
                    "run completed with SLA violations"
                );
            }
            0
        }
        RunStatus::Failed { .. } | RunStatus::Cancelled => 1,
    }
}

fn print_summary(report: &RunReport) {
    println!("{}", report.log_line());
    for violation in report.violations() {
        println!("  [{}] {}", violation.severity, violation.message);
    }
    if report.failed > 0 {
        println!(
            "  {} recipient(s) need manual follow-up, see `courier failures`",
            report.failed
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dry_run_needs_no_credentials() {
        let config = CourierConfig::default();
        let sender = build_sender(&config, true).unwrap();
        assert_eq!(sender.name(), "dry-run");
    }

    #[test]
    fn live_sender_requires_credentials() {
        let config = CourierConfig::default();
        let err = build_sender(&config, false).err().unwrap();
        assert!(matches!(err, CourierError::Config(_)));
    }

    #[tokio::test]
    async fn dry_run_over_missing_manifest_exits_nonzero() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = CourierConfig::default();
        config.storage.data_dir = dir.path().to_string_lossy().into_owned();

        let code = run_distribution(&config, None, true, CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(code, 1);
        assert!(config.storage.run_log().exists());
    }

    #[tokio::test]
    async fn dry_run_over_manifest_completes() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = CourierConfig::default();
        config.storage.data_dir = dir.path().to_string_lossy().into_owned();
        config.delivery.recipient_pacing_ms = 0;

        let manifest = courier_delivery::Manifest {
            batches: vec![courier_core::RecipientBatch::daily(
                courier_core::Recipient {
                    id: "adv-1".into(),
                    name: "Asha".into(),
                    contact: "919800000001".into(),
                },
                "Morning brief",
                None,
                None,
            )],
        };
        courier_core::persist::write_json_atomic(&config.storage.manifest(), &manifest)
            .await
            .unwrap();

        let code = run_distribution(&config, None, true, CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(code, 0);
        let reports = std::fs::read_dir(config.storage.reports_path()).unwrap().count();
        assert_eq!(reports, 1);
    }
}
