// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Courier delivery subsystem.
//!
//! This crate provides the error type, the delivery data model shared by the
//! resilience, KPI, queue, and delivery crates, and the [`MessageSender`]
//! trait that every outbound transport implements.

pub mod error;
pub mod persist;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::CourierError;
pub use traits::MessageSender;
pub use types::{
    DeliveryAttempt, ErrorCategory, MessageId, MessageKind, OutboundMessage, Recipient,
    RecipientBatch,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn courier_error_has_all_variants() {
        let _config = CourierError::Config("test".into());
        let _storage = CourierError::Storage {
            source: Box::new(std::io::Error::other("test")),
        };
        let _channel = CourierError::Channel {
            message: "test".into(),
            source: None,
        };
        let _serde = CourierError::Serialization(
            serde_json::from_str::<u32>("nope").unwrap_err(),
        );
        let _not_found = CourierError::NotFound("item".into());
        let _cancelled = CourierError::Cancelled;
        let _timeout = CourierError::Timeout {
            duration: std::time::Duration::from_secs(15),
        };
        let _internal = CourierError::Internal("test".into());
    }

    #[test]
    fn message_kind_display_and_parse() {
        use std::str::FromStr;

        for kind in [MessageKind::Text, MessageKind::Image, MessageKind::TemplatedText] {
            let s = kind.to_string();
            let parsed = MessageKind::from_str(&s).expect("should parse back");
            assert_eq!(kind, parsed);
        }
        assert_eq!(MessageKind::TemplatedText.to_string(), "templated_text");
    }

    #[test]
    fn message_sender_is_object_safe() {
        fn _assert_dyn(_: &dyn MessageSender) {}
    }
}
