// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Failure message classification.
//!
//! The category is informational: it drives failure-log severity and
//! operator messaging, and never gates the retrier unless the operator
//! opts in.

use courier_core::{CourierError, ErrorCategory};

/// Ordered substring rules; the first matching rule wins.
const RULES: &[(&[&str], ErrorCategory)] = &[
    (&["invalid", "not found"], ErrorCategory::Permanent),
    (&["timeout", "network"], ErrorCategory::Transient),
    (&["rate", "limit"], ErrorCategory::Transient),
    (&["auth", "token"], ErrorCategory::Systemic),
];

/// Classify a raw failure message, case-insensitively.
///
/// An empty or whitespace-only message is `Unknown`; anything that matches
/// no rule is treated as `Transient`.
pub fn classify(message: &str) -> ErrorCategory {
    if message.trim().is_empty() {
        return ErrorCategory::Unknown;
    }
    let lowered = message.to_lowercase();
    RULES
        .iter()
        .find(|(needles, _)| needles.iter().any(|n| lowered.contains(n)))
        .map(|(_, category)| *category)
        .unwrap_or(ErrorCategory::Transient)
}

/// Classify a [`CourierError`] by its upstream message.
pub fn classify_error(err: &CourierError) -> ErrorCategory {
    classify(&err.upstream_message())
}
