// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that serde attributes cannot express:
//! ratios within range, non-zero bucket sizes, non-empty paths.

use crate::diagnostic::ConfigError;
use crate::model::CourierConfig;

/// Upstream calls are expected to give up within this many seconds.
const MAX_REQUEST_TIMEOUT_SECS: u64 = 15;

/// Validate a deserialized configuration for semantic correctness.
///
/// Collects every failure rather than stopping at the first.
pub fn validate_config(config: &CourierConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if !matches!(
        config.general.log_level.as_str(),
        "trace" | "debug" | "info" | "warn" | "error"
    ) {
        errors.push(ConfigError::validation(format!(
            "general.log_level `{}` must be one of trace, debug, info, warn, error",
            config.general.log_level
        )));
    }

    let breaker = &config.breaker;
    if !(breaker.failure_threshold > 0.0 && breaker.failure_threshold <= 1.0) {
        errors.push(ConfigError::validation(format!(
            "breaker.failure_threshold must be in (0, 1], got {}",
            breaker.failure_threshold
        )));
    }
    if breaker.bucket_size == 0 {
        errors.push(ConfigError::validation(
            "breaker.bucket_size must be at least 1",
        ));
    }
    if breaker.timeout_ms == 0 {
        errors.push(ConfigError::validation(
            "breaker.timeout_ms must be greater than zero",
        ));
    }

    for (name, value) in [
        (
            "sla.first_attempt_success_target",
            config.sla.first_attempt_success_target,
        ),
        ("sla.overall_delivery_target", config.sla.overall_delivery_target),
    ] {
        if !(0.0..=1.0).contains(&value) {
            errors.push(ConfigError::validation(format!(
                "{name} must be within [0, 1], got {value}"
            )));
        }
    }
    if config.sla.max_avg_delivery_ms <= 0.0 {
        errors.push(ConfigError::validation(format!(
            "sla.max_avg_delivery_ms must be positive, got {}",
            config.sla.max_avg_delivery_ms
        )));
    }
    if config.sla.max_distribution_minutes <= 0.0 {
        errors.push(ConfigError::validation(format!(
            "sla.max_distribution_minutes must be positive, got {}",
            config.sla.max_distribution_minutes
        )));
    }

    let storage = &config.storage;
    for (name, value) in [
        ("storage.data_dir", &storage.data_dir),
        ("storage.queue_dir", &storage.queue_dir),
        ("storage.reports_dir", &storage.reports_dir),
        ("storage.failure_log_path", &storage.failure_log_path),
        ("storage.run_log_path", &storage.run_log_path),
        ("storage.manifest_path", &storage.manifest_path),
    ] {
        if value.trim().is_empty() {
            errors.push(ConfigError::validation(format!("{name} must not be empty")));
        }
    }

    if config.unlock.notification_template.trim().is_empty() {
        errors.push(ConfigError::validation(
            "unlock.notification_template must not be empty",
        ));
    }

    let whatsapp = &config.whatsapp;
    if whatsapp.request_timeout_secs == 0 || whatsapp.request_timeout_secs > MAX_REQUEST_TIMEOUT_SECS
    {
        errors.push(ConfigError::validation(format!(
            "whatsapp.request_timeout_secs must be between 1 and {MAX_REQUEST_TIMEOUT_SECS}, got {}",
            whatsapp.request_timeout_secs
        )));
    }
    if !whatsapp.api_base.starts_with("http://") && !whatsapp.api_base.starts_with("https://") {
        errors.push(ConfigError::validation(format!(
            "whatsapp.api_base `{}` must be an http(s) URL",
            whatsapp.api_base
        )));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn has_error(errors: &[ConfigError], needle: &str) -> bool {
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains(needle)))
    }

    #[test]
    fn default_config_validates() {
        assert!(validate_config(&CourierConfig::default()).is_ok());
    }

    #[test]
    fn zero_threshold_fails_validation() {
        let mut config = CourierConfig::default();
        config.breaker.failure_threshold = 0.0;
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "failure_threshold"));
    }

    #[test]
    fn zero_bucket_size_fails_validation() {
        let mut config = CourierConfig::default();
        config.breaker.bucket_size = 0;
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "bucket_size"));
    }

    #[test]
    fn out_of_range_target_fails_validation() {
        let mut config = CourierConfig::default();
        config.sla.overall_delivery_target = 99.99;
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "overall_delivery_target"));
    }

    #[test]
    fn collects_every_error() {
        let mut config = CourierConfig::default();
        config.general.log_level = "loud".into();
        config.storage.failure_log_path = " ".into();
        config.whatsapp.request_timeout_secs = 60;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(has_error(&errors, "log_level"));
        assert!(has_error(&errors, "failure_log_path"));
        assert!(has_error(&errors, "request_timeout_secs"));
    }
}
