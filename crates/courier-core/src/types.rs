// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared by the delivery, KPI, and queue crates.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Identifier assigned by the upstream channel to a sent message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The shape of an outbound message, as seen by KPI accounting.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MessageKind {
    Text,
    Image,
    TemplatedText,
}

/// Coarse failure category derived from an upstream error message.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCategory {
    /// Will never succeed on retry (invalid recipient, unknown number).
    Permanent,
    /// Network, timeout, or rate limiting; retry is appropriate.
    Transient,
    /// Authentication or token failure; affects every subsequent send.
    Systemic,
    /// No message to classify.
    Unknown,
}

/// A message to be sent through a [`MessageSender`](crate::MessageSender).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundMessage {
    /// Plain text body.
    Text { body: String },
    /// Image by public URL with an optional caption.
    Image {
        url: String,
        #[serde(default)]
        caption: Option<String>,
    },
    /// Pre-approved template with positional body parameters.
    Template {
        name: String,
        #[serde(default = "default_template_language")]
        language: String,
        #[serde(default)]
        params: Vec<String>,
        /// Opaque payload echoed back when the recipient taps the quick-reply button.
        #[serde(default)]
        button_payload: Option<String>,
    },
}

fn default_template_language() -> String {
    "en".to_string()
}

impl OutboundMessage {
    /// Convenience constructor for a text message.
    pub fn text(body: impl Into<String>) -> Self {
        Self::Text { body: body.into() }
    }

    /// Convenience constructor for an image message.
    pub fn image(url: impl Into<String>, caption: Option<String>) -> Self {
        Self::Image {
            url: url.into(),
            caption,
        }
    }

    /// The KPI kind of this message.
    pub fn kind(&self) -> MessageKind {
        match self {
            Self::Text { .. } => MessageKind::Text,
            Self::Image { .. } => MessageKind::Image,
            Self::Template { .. } => MessageKind::TemplatedText,
        }
    }
}

/// An advisor receiving a distribution batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    /// Stable identifier used in reports and the failure log.
    pub id: String,
    /// Display name for operator follow-up.
    #[serde(default)]
    pub name: String,
    /// Channel address (phone number in E.164 without the plus sign).
    pub contact: String,
}

/// The ordered set of messages one recipient gets in a distribution run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipientBatch {
    pub recipient: Recipient,
    pub messages: Vec<OutboundMessage>,
}

impl RecipientBatch {
    /// Builds the standard daily batch: primary text, then the optional
    /// image, then the optional secondary text.
    pub fn daily(
        recipient: Recipient,
        primary_text: impl Into<String>,
        image: Option<(String, Option<String>)>,
        secondary_text: Option<String>,
    ) -> Self {
        let mut messages = vec![OutboundMessage::text(primary_text)];
        if let Some((url, caption)) = image {
            messages.push(OutboundMessage::image(url, caption));
        }
        if let Some(text) = secondary_text {
            messages.push(OutboundMessage::text(text));
        }
        Self {
            recipient,
            messages,
        }
    }
}

/// One send of one message to one recipient.
///
/// `error_category` is present if and only if `success` is false.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryAttempt {
    pub recipient: String,
    pub message_kind: MessageKind,
    pub success: bool,
    /// Attempts beyond the first.
    pub retry_count: u32,
    pub delivery_time_ms: u64,
    pub error_category: Option<ErrorCategory>,
}

impl DeliveryAttempt {
    /// A successful send.
    pub fn succeeded(
        recipient: impl Into<String>,
        message_kind: MessageKind,
        retry_count: u32,
        delivery_time_ms: u64,
    ) -> Self {
        Self {
            recipient: recipient.into(),
            message_kind,
            success: true,
            retry_count,
            delivery_time_ms,
            error_category: None,
        }
    }

    /// A send that still failed after all retries.
    pub fn failed(
        recipient: impl Into<String>,
        message_kind: MessageKind,
        retry_count: u32,
        delivery_time_ms: u64,
        category: ErrorCategory,
    ) -> Self {
        Self {
            recipient: recipient.into(),
            message_kind,
            success: false,
            retry_count,
            delivery_time_ms,
            error_category: Some(category),
        }
    }

    /// Succeeded with no retries.
    pub fn is_first_attempt_success(&self) -> bool {
        self.success && self.retry_count == 0
    }
}
