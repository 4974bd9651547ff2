// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Courier - reliable daily content distribution over WhatsApp.
//!
//! This is the binary entry point for distribution runs and the
//! click-to-unlock queue.

mod content;
mod dry_run;
mod run;
mod shutdown;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use courier_config::CourierConfig;

/// Courier - reliable daily content distribution over WhatsApp.
#[derive(Parser, Debug)]
#[command(name = "courier", version, about, long_about = None)]
struct Cli {
    /// Explicit config file instead of the XDG lookup.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Deliver every batch in the manifest and write a run report.
    Run {
        /// Manifest to read instead of `storage.manifest_path`.
        #[arg(long)]
        manifest: Option<PathBuf>,
        /// Log messages instead of sending them.
        #[arg(long)]
        dry_run: bool,
    },
    /// Queue a content bundle and send its unlock notification.
    Notify {
        /// Recipient phone number.
        recipient: String,
        /// Content bundle JSON file.
        bundle: PathBuf,
        #[arg(long)]
        dry_run: bool,
    },
    /// Handle an unlock payload or keyword from a recipient.
    Unlock {
        recipient: String,
        /// Button payload (`UNLOCK_CONTENT_<id>`, `UNLOCK_CONTENT_ALL`) or text.
        payload: String,
        #[arg(long)]
        dry_run: bool,
    },
    /// List pending queue items for a recipient.
    Pending { recipient: String },
    /// Show the failures that need manual follow-up.
    Failures,
    /// Manage Courier configuration.
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Validate the configuration and print the effective settings.
    Check,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => courier_config::load_and_validate_path(path),
        None => courier_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            courier_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config.general.log_level);

    let code = match cli.command {
        Some(Commands::Run { manifest, dry_run }) => {
            let cancel = shutdown::install_signal_handler();
            run::run_distribution(&config, manifest, dry_run, cancel).await
        }
        Some(Commands::Notify {
            recipient,
            bundle,
            dry_run,
        }) => {
            let cancel = shutdown::install_signal_handler();
            content::notify(&config, &recipient, &bundle, dry_run, cancel)
                .await
                .map(|()| 0)
        }
        Some(Commands::Unlock {
            recipient,
            payload,
            dry_run,
        }) => {
            let cancel = shutdown::install_signal_handler();
            content::unlock(&config, &recipient, &payload, dry_run, cancel)
                .await
                .map(|()| 0)
        }
        Some(Commands::Pending { recipient }) => {
            content::pending(&config, &recipient).await.map(|()| 0)
        }
        Some(Commands::Failures) => content::failures(&config).await.map(|()| 0),
        Some(Commands::Config {
            action: ConfigCommands::Check,
        }) => {
            print_config_summary(&config);
            Ok(0)
        }
        None => {
            println!("courier: use --help for available commands");
            Ok(0)
        }
    };

    match code {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("courier: {e}");
            std::process::exit(1);
        }
    }
}

fn print_config_summary(config: &CourierConfig) {
    let delivery = &config.delivery;
    let storage = &config.storage;
    println!("courier: config OK (general.name={})", config.general.name);
    println!(
        "  delivery: max_retries={} base_delay={}ms jitter<={}ms pacing={}ms retry_permanent={}",
        delivery.max_retries,
        delivery.base_delay_ms,
        delivery.max_jitter_ms,
        delivery.recipient_pacing_ms,
        delivery.retry_permanent_errors
    );
    println!(
        "  breaker: failure_threshold={} bucket_size={} timeout={}ms",
        config.breaker.failure_threshold, config.breaker.bucket_size, config.breaker.timeout_ms
    );
    println!("  queue: {}", storage.queue_path().display());
    println!("  reports: {}", storage.reports_path().display());
    println!("  failure log: {}", storage.failure_log().display());
    println!("  run log: {}", storage.run_log().display());
    println!("  manifest: {}", storage.manifest().display());
    let live = config.whatsapp.phone_number_id.is_some() && config.whatsapp.access_token.is_some();
    println!(
        "  whatsapp: {} ({})",
        config.whatsapp.api_base,
        if live { "credentials set" } else { "dry-run only" }
    );
}

/// Initialize the tracing subscriber with the configured level for every courier crate.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "courier={log_level},courier_core={log_level},courier_resilience={log_level},\
             courier_kpi={log_level},courier_queue={log_level},courier_delivery={log_level},\
             courier_whatsapp={log_level},warn"
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
