// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP transport for the WhatsApp Cloud API.
//!
//! Provides [`WhatsAppSender`], a [`MessageSender`] that posts to
//! `{api_base}/{api_version}/{phone_number_id}/messages` with a bearer token.
//! Retrying is left to the caller's backoff retrier; every failure surfaces
//! as [`CourierError::Channel`] carrying the upstream wording.

use std::time::Duration;

use async_trait::async_trait;
use courier_config::model::WhatsAppConfig;
use courier_core::{CourierError, MessageId, MessageSender, OutboundMessage};
use reqwest::header::{HeaderMap, HeaderValue};
use tracing::debug;

use crate::types::{ApiErrorResponse, SendRequest, SendResponse};

/// WhatsApp Cloud API message sender.
#[derive(Debug, Clone)]
pub struct WhatsAppSender {
    client: reqwest::Client,
    endpoint: String,
}

impl WhatsAppSender {
    /// Creates a sender for one business phone number.
    pub fn new(
        api_base: &str,
        api_version: &str,
        phone_number_id: &str,
        access_token: &str,
        timeout: Duration,
    ) -> Result<Self, CourierError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "authorization",
            HeaderValue::from_str(&format!("Bearer {access_token}")).map_err(|e| {
                CourierError::Config(format!("invalid access token header value: {e}"))
            })?,
        );
        headers.insert("content-type", HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| CourierError::Channel {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            endpoint: format!(
                "{}/{}/{}/messages",
                api_base.trim_end_matches('/'),
                api_version.trim_matches('/'),
                phone_number_id
            ),
        })
    }

    /// Builds a sender from the `[whatsapp]` config section.
    pub fn from_config(config: &WhatsAppConfig) -> Result<Self, CourierError> {
        let phone_number_id = config.phone_number_id.as_deref().ok_or_else(|| {
            CourierError::Config("whatsapp.phone_number_id is not set".into())
        })?;
        let access_token = config.access_token.as_deref().ok_or_else(|| {
            CourierError::Config("whatsapp.access_token is not set".into())
        })?;
        Self::new(
            &config.api_base,
            &config.api_version,
            phone_number_id,
            access_token,
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl MessageSender for WhatsAppSender {
    fn name(&self) -> &str {
        "whatsapp"
    }

    async fn send(
        &self,
        recipient: &str,
        message: &OutboundMessage,
    ) -> Result<MessageId, CourierError> {
        let request = SendRequest::new(recipient, message);

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        debug!(status = %status, kind = %message.kind(), "whatsapp response received");

        let body = response.text().await.map_err(transport_error)?;

        if !status.is_success() {
            let message = match serde_json::from_str::<ApiErrorResponse>(&body) {
                Ok(api_err) => api_err.error.message,
                Err(_) => format!("API returned {status}: {body}"),
            };
            return Err(CourierError::channel(message));
        }

        let parsed: SendResponse =
            serde_json::from_str(&body).map_err(|e| CourierError::Channel {
                message: format!("failed to parse API response: {e}"),
                source: Some(Box::new(e)),
            })?;
        parsed
            .messages
            .into_iter()
            .next()
            .map(|m| MessageId(m.id))
            .ok_or_else(|| CourierError::channel("API response contained no message id"))
    }
}

/// Maps a reqwest failure to wording the classifier recognizes.
fn transport_error(e: reqwest::Error) -> CourierError {
    let message = if e.is_timeout() {
        format!("request timeout: {e}")
    } else if e.is_connect() || e.is_request() {
        format!("network error: {e}")
    } else {
        format!("HTTP request failed: {e}")
    };
    CourierError::Channel {
        message,
        source: Some(Box::new(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_core::ErrorCategory;
    use courier_resilience::classify_error;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_sender(base_url: &str) -> WhatsAppSender {
        WhatsAppSender::new(base_url, "v19.0", "1234567890", "test-token", Duration::from_secs(2))
            .unwrap()
    }

    #[test]
    fn endpoint_is_versioned_per_phone_number() {
        let sender = test_sender("https://graph.facebook.com/");
        assert_eq!(
            sender.endpoint(),
            "https://graph.facebook.com/v19.0/1234567890/messages"
        );
    }

    #[test]
    fn from_config_requires_credentials() {
        let config = WhatsAppConfig::default();
        let err = WhatsAppSender::from_config(&config).unwrap_err();
        assert!(matches!(err, CourierError::Config(m) if m.contains("phone_number_id")));
    }

    #[tokio::test]
    async fn send_text_returns_message_id() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v19.0/1234567890/messages"))
            .and(header("authorization", "Bearer test-token"))
            .and(body_partial_json(json!({
                "to": "919800000001",
                "type": "text",
                "text": {"body": "Morning brief"}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "messaging_product": "whatsapp",
                "contacts": [{"input": "919800000001", "wa_id": "919800000001"}],
                "messages": [{"id": "wamid.HBgM"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let sender = test_sender(&server.uri());
        let id = sender
            .send_text("919800000001", "Morning brief")
            .await
            .unwrap();
        assert_eq!(id, MessageId("wamid.HBgM".into()));
    }

    #[tokio::test]
    async fn api_error_message_is_the_upstream_message() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": {
                    "message": "Invalid parameter: recipient phone number not in allowed list",
                    "type": "OAuthException",
                    "code": 131030
                }
            })))
            .mount(&server)
            .await;

        let sender = test_sender(&server.uri());
        let err = sender.send_text("1", "hi").await.unwrap_err();
        assert_eq!(
            err.upstream_message(),
            "Invalid parameter: recipient phone number not in allowed list"
        );
        assert_eq!(classify_error(&err), ErrorCategory::Permanent);
    }

    #[tokio::test]
    async fn non_json_error_falls_back_to_status_and_body() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("upstream unavailable"))
            .mount(&server)
            .await;

        let sender = test_sender(&server.uri());
        let err = sender.send_text("1", "hi").await.unwrap_err();
        let message = err.upstream_message();
        assert!(message.contains("503"));
        assert!(message.contains("upstream unavailable"));
    }

    #[tokio::test]
    async fn slow_response_maps_to_timeout_wording() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"messages": [{"id": "late"}]}))
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let sender = test_sender(&server.uri());
        let err = sender.send_text("1", "hi").await.unwrap_err();
        assert!(err.upstream_message().contains("timeout"));
    }

    #[tokio::test]
    async fn template_send_includes_button_payload() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(body_partial_json(json!({
                "type": "template",
                "template": {"name": "daily_content_ready", "language": {"code": "en"}}
            })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"messages": [{"id": "wamid.T"}]})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let sender = test_sender(&server.uri());
        let message = OutboundMessage::Template {
            name: "daily_content_ready".into(),
            language: "en".into(),
            params: vec!["02 Mar 2026".into()],
            button_payload: Some("UNLOCK_CONTENT_ALL".into()),
        };
        let id = sender.send("1", &message).await.unwrap();
        assert_eq!(id.0, "wamid.T");
    }

    #[tokio::test]
    async fn missing_message_id_is_an_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"messages": []})))
            .mount(&server)
            .await;

        let sender = test_sender(&server.uri());
        let err = sender.send_text("1", "hi").await.unwrap_err();
        assert!(err.upstream_message().contains("no message id"));
    }
}
