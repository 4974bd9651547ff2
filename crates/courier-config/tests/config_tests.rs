// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Courier configuration system.

use courier_config::diagnostic::ConfigError;
use courier_config::{load_and_validate_str, load_config_from_str};

/// Valid TOML with all sections deserializes successfully.
#[test]
fn valid_toml_deserializes_into_courier_config() {
    let toml = r#"
[general]
name = "advisor-daily"
log_level = "debug"

[delivery]
max_retries = 2
base_delay_ms = 500
max_jitter_ms = 0
recipient_pacing_ms = 250
retry_permanent_errors = false

[breaker]
failure_threshold = 0.5
bucket_size = 4
timeout_ms = 30000

[sla]
first_attempt_success_target = 0.95
overall_delivery_target = 0.999
max_avg_delivery_ms = 3000.0
max_distribution_minutes = 10.0

[unlock]
intro_pacing_ms = 10
post_pacing_ms = 20
notification_template = "content_ready_v2"
template_language = "en_US"

[storage]
data_dir = "/tmp/courier"
failure_log_path = "followup.json"

[whatsapp]
phone_number_id = "1234567890"
access_token = "EAAG-test"
request_timeout_secs = 10
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.general.name, "advisor-daily");
    assert_eq!(config.delivery.max_retries, 2);
    assert!(!config.delivery.retry_permanent_errors);
    assert_eq!(config.breaker.bucket_size, 4);
    assert_eq!(config.sla.max_distribution_minutes, 10.0);
    assert_eq!(config.unlock.notification_template, "content_ready_v2");
    assert_eq!(
        config.storage.failure_log(),
        std::path::PathBuf::from("/tmp/courier/followup.json")
    );
    assert_eq!(config.whatsapp.phone_number_id.as_deref(), Some("1234567890"));
    assert_eq!(config.whatsapp.request_timeout_secs, 10);
}

/// Unknown field in [breaker] is rejected by deny_unknown_fields.
#[test]
fn unknown_field_in_breaker_produces_error() {
    let toml = r#"
[breaker]
buckt_size = 3
"#;
    let err = load_config_from_str(toml).expect_err("should reject unknown field");
    let err_str = format!("{err}");
    assert!(
        err_str.contains("unknown field") || err_str.contains("buckt_size"),
        "error should mention the bad key, got: {err_str}"
    );
}

/// The diagnostic pipeline suggests the intended key.
#[test]
fn unknown_key_diagnostic_carries_suggestion() {
    let toml = r#"
[delivery]
max_retires = 3
"#;
    let errors = load_and_validate_str(toml).expect_err("should fail");
    assert!(errors.iter().any(|e| matches!(
        e,
        ConfigError::UnknownKey { key, suggestion: Some(s), .. }
            if key == "max_retires" && s == "max_retries"
    )));
}

/// Type mismatches surface as InvalidType diagnostics.
#[test]
fn wrong_type_produces_invalid_type() {
    let toml = r#"
[delivery]
max_retries = "three"
"#;
    let errors = load_and_validate_str(toml).expect_err("should fail");
    assert!(
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::InvalidType { .. })),
        "got: {errors:?}"
    );
}

/// Semantically invalid values pass deserialization but fail validation.
#[test]
fn semantic_errors_are_reported_after_parsing() {
    let toml = r#"
[breaker]
failure_threshold = 1.5
"#;
    let errors = load_and_validate_str(toml).expect_err("should fail validation");
    assert!(errors.iter().any(
        |e| matches!(e, ConfigError::Validation { message } if message.contains("failure_threshold"))
    ));
}

/// An empty document yields the compiled defaults.
#[test]
fn empty_toml_yields_defaults() {
    let config = load_and_validate_str("").expect("defaults must validate");
    assert_eq!(config.delivery.max_retries, 3);
    assert_eq!(config.breaker.timeout_ms, 600_000);
}
