// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Courier delivery subsystem.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Top-level Courier configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CourierConfig {
    /// Process identity and logging.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Retry and pacing for bulk distribution runs.
    #[serde(default)]
    pub delivery: DeliveryConfig,

    /// Circuit breaker thresholds.
    #[serde(default)]
    pub breaker: BreakerConfig,

    /// SLA targets evaluated at the end of every run.
    #[serde(default)]
    pub sla: SlaConfig,

    /// Click-to-unlock delivery settings.
    #[serde(default)]
    pub unlock: UnlockConfig,

    /// On-disk locations for the queue, reports, and logs.
    #[serde(default)]
    pub storage: StorageConfig,

    /// WhatsApp Cloud API transport.
    #[serde(default)]
    pub whatsapp: WhatsAppConfig,
}

/// Process identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GeneralConfig {
    /// Name used in run logs.
    #[serde(default = "default_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_name() -> String {
    "courier".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Retry and pacing configuration for distribution runs.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DeliveryConfig {
    /// Retries after the first attempt (total attempts = max_retries + 1).
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base backoff delay; attempt `n` waits `base * 2^n` plus jitter.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Upper bound of the uniform random jitter added to each backoff.
    #[serde(default = "default_max_jitter_ms")]
    pub max_jitter_ms: u64,

    /// Fixed pause after each processed recipient.
    #[serde(default = "default_recipient_pacing_ms")]
    pub recipient_pacing_ms: u64,

    /// When false, a failure classified PERMANENT stops further retries.
    #[serde(default = "default_retry_permanent_errors")]
    pub retry_permanent_errors: bool,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
            max_jitter_ms: default_max_jitter_ms(),
            recipient_pacing_ms: default_recipient_pacing_ms(),
            retry_permanent_errors: default_retry_permanent_errors(),
        }
    }
}

fn default_max_retries() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    1000
}

fn default_max_jitter_ms() -> u64 {
    1000
}

fn default_recipient_pacing_ms() -> u64 {
    1000
}

fn default_retry_permanent_errors() -> bool {
    true
}

/// Circuit breaker configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BreakerConfig {
    /// Failure ratio at or above which the breaker opens.
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: f64,

    /// Minimum number of outcomes before the ratio is evaluated.
    #[serde(default = "default_bucket_size")]
    pub bucket_size: u32,

    /// Cooldown before an open breaker allows a trial send.
    #[serde(default = "default_breaker_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: default_failure_threshold(),
            bucket_size: default_bucket_size(),
            timeout_ms: default_breaker_timeout_ms(),
        }
    }
}

fn default_failure_threshold() -> f64 {
    0.20
}

fn default_bucket_size() -> u32 {
    10
}

fn default_breaker_timeout_ms() -> u64 {
    600_000
}

/// SLA targets.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SlaConfig {
    /// Minimum share of deliveries that succeed with no retry.
    #[serde(default = "default_first_attempt_target")]
    pub first_attempt_success_target: f64,

    /// Minimum share of deliveries that eventually succeed.
    #[serde(default = "default_overall_target")]
    pub overall_delivery_target: f64,

    /// Maximum mean delivery latency.
    #[serde(default = "default_max_avg_delivery_ms")]
    pub max_avg_delivery_ms: f64,

    /// Maximum wall-clock length of a distribution run.
    #[serde(default = "default_max_distribution_minutes")]
    pub max_distribution_minutes: f64,
}

impl Default for SlaConfig {
    fn default() -> Self {
        Self {
            first_attempt_success_target: default_first_attempt_target(),
            overall_delivery_target: default_overall_target(),
            max_avg_delivery_ms: default_max_avg_delivery_ms(),
            max_distribution_minutes: default_max_distribution_minutes(),
        }
    }
}

fn default_first_attempt_target() -> f64 {
    0.99
}

fn default_overall_target() -> f64 {
    0.9999
}

fn default_max_avg_delivery_ms() -> f64 {
    2500.0
}

fn default_max_distribution_minutes() -> f64 {
    5.0
}

/// Click-to-unlock delivery configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct UnlockConfig {
    /// Pause after the per-item introduction message.
    #[serde(default = "default_intro_pacing_ms")]
    pub intro_pacing_ms: u64,

    /// Pause between consecutive posts.
    #[serde(default = "default_post_pacing_ms")]
    pub post_pacing_ms: u64,

    /// Template used for the daily "content ready" notification.
    #[serde(default = "default_notification_template")]
    pub notification_template: String,

    /// Language code of the notification template.
    #[serde(default = "default_template_language")]
    pub template_language: String,
}

impl Default for UnlockConfig {
    fn default() -> Self {
        Self {
            intro_pacing_ms: default_intro_pacing_ms(),
            post_pacing_ms: default_post_pacing_ms(),
            notification_template: default_notification_template(),
            template_language: default_template_language(),
        }
    }
}

fn default_intro_pacing_ms() -> u64 {
    1000
}

fn default_post_pacing_ms() -> u64 {
    2000
}

fn default_notification_template() -> String {
    "daily_content_ready".to_string()
}

fn default_template_language() -> String {
    "en".to_string()
}

/// Storage locations.
///
/// Relative paths in the other fields are resolved against `data_dir`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Root directory for all persisted documents.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Directory holding one queue document per recipient.
    #[serde(default = "default_queue_dir")]
    pub queue_dir: String,

    /// Directory receiving one JSON report per run.
    #[serde(default = "default_reports_dir")]
    pub reports_dir: String,

    /// JSON array of failures needing manual follow-up.
    #[serde(default = "default_failure_log_path")]
    pub failure_log_path: String,

    /// Human-readable run log.
    #[serde(default = "default_run_log_path")]
    pub run_log_path: String,

    /// Distribution manifest consumed by `courier run`.
    #[serde(default = "default_manifest_path")]
    pub manifest_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            queue_dir: default_queue_dir(),
            reports_dir: default_reports_dir(),
            failure_log_path: default_failure_log_path(),
            run_log_path: default_run_log_path(),
            manifest_path: default_manifest_path(),
        }
    }
}

impl StorageConfig {
    /// Resolves a configured path against `data_dir` unless it is absolute.
    pub fn resolve(&self, path: &str) -> PathBuf {
        let candidate = PathBuf::from(path);
        if candidate.is_absolute() {
            candidate
        } else {
            PathBuf::from(&self.data_dir).join(candidate)
        }
    }

    pub fn queue_path(&self) -> PathBuf {
        self.resolve(&self.queue_dir)
    }

    pub fn reports_path(&self) -> PathBuf {
        self.resolve(&self.reports_dir)
    }

    pub fn failure_log(&self) -> PathBuf {
        self.resolve(&self.failure_log_path)
    }

    pub fn run_log(&self) -> PathBuf {
        self.resolve(&self.run_log_path)
    }

    pub fn manifest(&self) -> PathBuf {
        self.resolve(&self.manifest_path)
    }
}

fn default_data_dir() -> String {
    dirs::data_dir()
        .map(|p| p.join("courier"))
        .unwrap_or_else(|| PathBuf::from(".courier"))
        .to_string_lossy()
        .into_owned()
}

fn default_queue_dir() -> String {
    "queue".to_string()
}

fn default_reports_dir() -> String {
    "reports".to_string()
}

fn default_failure_log_path() -> String {
    "failures.json".to_string()
}

fn default_run_log_path() -> String {
    "distribution.log".to_string()
}

fn default_manifest_path() -> String {
    "manifest.json".to_string()
}

/// WhatsApp Cloud API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WhatsAppConfig {
    /// Graph API base URL.
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Graph API version segment.
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Sending phone number id. `None` disables the live transport.
    #[serde(default)]
    pub phone_number_id: Option<String>,

    /// Bearer access token. `None` requires the environment variable.
    #[serde(default)]
    pub access_token: Option<String>,

    /// Per-request upstream timeout.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for WhatsAppConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            api_version: default_api_version(),
            phone_number_id: None,
            access_token: None,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_api_base() -> String {
    "https://graph.facebook.com".to_string()
}

fn default_api_version() -> String {
    "v19.0".to_string()
}

fn default_request_timeout_secs() -> u64 {
    15
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = CourierConfig::default();
        assert_eq!(config.delivery.max_retries, 3);
        assert_eq!(config.delivery.base_delay_ms, 1000);
        assert_eq!(config.delivery.recipient_pacing_ms, 1000);
        assert!(config.delivery.retry_permanent_errors);
        assert_eq!(config.breaker.bucket_size, 10);
        assert!((config.breaker.failure_threshold - 0.20).abs() < f64::EPSILON);
        assert_eq!(config.breaker.timeout_ms, 600_000);
        assert!((config.sla.overall_delivery_target - 0.9999).abs() < f64::EPSILON);
        assert_eq!(config.unlock.post_pacing_ms, 2000);
        assert_eq!(config.unlock.intro_pacing_ms, 1000);
        assert_eq!(config.whatsapp.request_timeout_secs, 15);
    }

    #[test]
    fn relative_storage_paths_resolve_under_data_dir() {
        let storage = StorageConfig {
            data_dir: "/var/lib/courier".into(),
            ..StorageConfig::default()
        };
        assert_eq!(
            storage.queue_path(),
            PathBuf::from("/var/lib/courier/queue")
        );
        assert_eq!(
            storage.failure_log(),
            PathBuf::from("/var/lib/courier/failures.json")
        );
    }

    #[test]
    fn absolute_storage_paths_are_kept() {
        let storage = StorageConfig {
            data_dir: "/var/lib/courier".into(),
            manifest_path: "/srv/today/manifest.json".into(),
            ..StorageConfig::default()
        };
        assert_eq!(
            storage.manifest(),
            PathBuf::from("/srv/today/manifest.json")
        );
    }
}
