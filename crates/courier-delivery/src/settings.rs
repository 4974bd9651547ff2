// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Runtime settings derived from [`CourierConfig`].

use std::time::Duration;

use courier_config::CourierConfig;
use courier_core::ErrorCategory;
use courier_kpi::SlaTargets;
use courier_resilience::{BackoffPolicy, BackoffRetrier, BreakerSettings, classify_error};

/// Settings for a push distribution run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeliverySettings {
    pub backoff: BackoffPolicy,
    pub breaker: BreakerSettings,
    pub sla: SlaTargets,
    /// Pause after each processed recipient.
    pub recipient_pacing: Duration,
    /// When false, a PERMANENT failure ends the retry loop early.
    pub retry_permanent_errors: bool,
}

impl Default for DeliverySettings {
    fn default() -> Self {
        Self::from_config(&CourierConfig::default())
    }
}

impl DeliverySettings {
    pub fn from_config(config: &CourierConfig) -> Self {
        Self {
            backoff: backoff_from_config(config),
            breaker: BreakerSettings {
                failure_threshold: config.breaker.failure_threshold,
                bucket_size: config.breaker.bucket_size,
                timeout: Duration::from_millis(config.breaker.timeout_ms),
            },
            sla: SlaTargets::from(&config.sla),
            recipient_pacing: Duration::from_millis(config.delivery.recipient_pacing_ms),
            retry_permanent_errors: config.delivery.retry_permanent_errors,
        }
    }

    pub fn retrier(&self) -> BackoffRetrier {
        build_retrier(self.backoff, self.retry_permanent_errors)
    }
}

/// Settings for the unlock orchestrator.
#[derive(Debug, Clone, PartialEq)]
pub struct UnlockSettings {
    pub backoff: BackoffPolicy,
    pub retry_permanent_errors: bool,
    /// Pause between the introduction message and the first post.
    pub intro_pacing: Duration,
    /// Pause between consecutive posts.
    pub post_pacing: Duration,
    pub notification_template: String,
    pub template_language: String,
}

impl Default for UnlockSettings {
    fn default() -> Self {
        Self::from_config(&CourierConfig::default())
    }
}

impl UnlockSettings {
    pub fn from_config(config: &CourierConfig) -> Self {
        Self {
            backoff: backoff_from_config(config),
            retry_permanent_errors: config.delivery.retry_permanent_errors,
            intro_pacing: Duration::from_millis(config.unlock.intro_pacing_ms),
            post_pacing: Duration::from_millis(config.unlock.post_pacing_ms),
            notification_template: config.unlock.notification_template.clone(),
            template_language: config.unlock.template_language.clone(),
        }
    }

    pub fn retrier(&self) -> BackoffRetrier {
        build_retrier(self.backoff, self.retry_permanent_errors)
    }
}

fn backoff_from_config(config: &CourierConfig) -> BackoffPolicy {
    BackoffPolicy {
        max_retries: config.delivery.max_retries,
        base_delay: Duration::from_millis(config.delivery.base_delay_ms),
        max_jitter: Duration::from_millis(config.delivery.max_jitter_ms),
    }
}

fn build_retrier(policy: BackoffPolicy, retry_permanent_errors: bool) -> BackoffRetrier {
    let retrier = BackoffRetrier::new(policy);
    if retry_permanent_errors {
        retrier
    } else {
        retrier.with_retry_predicate(|e| classify_error(e) != ErrorCategory::Permanent)
    }
}
