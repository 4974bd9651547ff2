// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Courier delivery subsystem.

use thiserror::Error;

/// The primary error type used across all Courier crates.
#[derive(Debug, Error)]
pub enum CourierError {
    /// Configuration errors (invalid TOML, missing credentials, bad values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (file I/O, directory creation, atomic rename).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Transport errors reported by the messaging channel.
    ///
    /// `message` carries the upstream wording verbatim; it is the only
    /// signal available to the error classifier.
    #[error("channel error: {message}")]
    Channel {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// JSON encoding or decoding failure for persisted documents.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A referenced entity (queue item, manifest, report) does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The operation was cancelled through its cancellation token.
    #[error("operation cancelled")]
    Cancelled,

    /// Operation exceeded its deadline.
    #[error("operation timeout after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl CourierError {
    /// Builds a channel error from an upstream message with no source.
    pub fn channel(message: impl Into<String>) -> Self {
        Self::Channel {
            message: message.into(),
            source: None,
        }
    }

    /// The raw failure text used for classification.
    ///
    /// Channel errors yield the upstream message without the `channel error:`
    /// prefix; every other variant falls back to its display form.
    pub fn upstream_message(&self) -> String {
        match self {
            Self::Channel { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    /// Returns `true` if this error came from a cancellation token.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl From<std::io::Error> for CourierError {
    fn from(err: std::io::Error) -> Self {
        Self::Storage {
            source: Box::new(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_message_strips_channel_prefix() {
        let err = CourierError::channel("Recipient phone number not found");
        assert_eq!(err.upstream_message(), "Recipient phone number not found");
        assert_eq!(
            err.to_string(),
            "channel error: Recipient phone number not found"
        );
    }

    #[test]
    fn upstream_message_falls_back_to_display() {
        let err = CourierError::Timeout {
            duration: std::time::Duration::from_secs(15),
        };
        assert!(err.upstream_message().contains("timeout"));
    }

    #[test]
    fn io_errors_map_to_storage() {
        let err: CourierError = std::io::Error::other("disk full").into();
        assert!(matches!(err, CourierError::Storage { .. }));
        assert!(err.to_string().contains("disk full"));
    }
}
