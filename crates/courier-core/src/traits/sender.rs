// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound transport trait for messaging channel integrations.

use async_trait::async_trait;

use crate::error::CourierError;
use crate::types::{MessageId, OutboundMessage};

/// Sends messages to a recipient over an external messaging channel.
///
/// Each call is assumed to carry its own upstream timeout and rate limit.
/// Failures must surface the upstream wording through
/// [`CourierError::Channel`] so it can be classified.
#[async_trait]
pub trait MessageSender: Send + Sync + 'static {
    /// Human-readable name of the transport, used in logs.
    fn name(&self) -> &str;

    /// Sends one message and returns the channel-assigned id.
    async fn send(
        &self,
        recipient: &str,
        message: &OutboundMessage,
    ) -> Result<MessageId, CourierError>;

    /// Sends a plain text message.
    async fn send_text(&self, recipient: &str, body: &str) -> Result<MessageId, CourierError> {
        self.send(recipient, &OutboundMessage::text(body)).await
    }

    /// Sends an image by URL with an optional caption.
    async fn send_image(
        &self,
        recipient: &str,
        url: &str,
        caption: Option<&str>,
    ) -> Result<MessageId, CourierError> {
        self.send(
            recipient,
            &OutboundMessage::image(url, caption.map(str::to_string)),
        )
        .await
    }

    /// Sends a template message with positional parameters.
    async fn send_template(
        &self,
        recipient: &str,
        name: &str,
        params: &[String],
    ) -> Result<MessageId, CourierError> {
        let message = OutboundMessage::Template {
            name: name.to_string(),
            language: "en".to_string(),
            params: params.to_vec(),
            button_payload: None,
        };
        self.send(recipient, &message).await
    }
}
