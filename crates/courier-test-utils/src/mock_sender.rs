// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scriptable message sender for deterministic testing.
//!
//! `MockSender` implements [`MessageSender`], records every call, and fails
//! on demand: always for a recipient, for the next N calls to a recipient,
//! or whenever the message content contains a marker string.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use courier_core::{CourierError, MessageId, MessageSender, OutboundMessage};

/// One call made through the mock.
#[derive(Debug, Clone, PartialEq)]
pub struct SentMessage {
    pub recipient: String,
    pub message: OutboundMessage,
    /// `None` when the scripted outcome was a failure.
    pub message_id: Option<MessageId>,
}

impl SentMessage {
    pub fn succeeded(&self) -> bool {
        self.message_id.is_some()
    }
}

#[derive(Debug, Default)]
struct Script {
    always: HashMap<String, String>,
    next: HashMap<String, (u32, String)>,
    markers: Vec<(String, String)>,
}

impl Script {
    fn failure_for(&mut self, recipient: &str, message: &OutboundMessage) -> Option<String> {
        if let Some(error) = self.always.get(recipient) {
            return Some(error.clone());
        }
        if let Some((remaining, error)) = self.next.get_mut(recipient) {
            if *remaining > 0 {
                *remaining -= 1;
                return Some(error.clone());
            }
        }
        let content = content_of(message);
        self.markers
            .iter()
            .find(|(marker, _)| content.contains(marker.as_str()))
            .map(|(_, error)| error.clone())
    }
}

fn content_of(message: &OutboundMessage) -> String {
    match message {
        OutboundMessage::Text { body } => body.clone(),
        OutboundMessage::Image { url, caption } => {
            format!("{url} {}", caption.as_deref().unwrap_or_default())
        }
        OutboundMessage::Template {
            name,
            params,
            button_payload,
            ..
        } => format!(
            "{name} {} {}",
            params.join(" "),
            button_payload.as_deref().unwrap_or_default()
        ),
    }
}

/// A mock outbound transport.
pub struct MockSender {
    calls: Mutex<Vec<SentMessage>>,
    script: Mutex<Script>,
    latency: Mutex<Option<Duration>>,
    counter: AtomicU64,
}

impl MockSender {
    /// Create a sender that succeeds on every call.
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            script: Mutex::new(Script::default()),
            latency: Mutex::new(None),
            counter: AtomicU64::new(0),
        }
    }

    /// Every call to `recipient` fails with `error`.
    pub async fn fail_always(&self, recipient: &str, error: &str) {
        self.script
            .lock()
            .await
            .always
            .insert(recipient.to_string(), error.to_string());
    }

    /// The next `times` calls to `recipient` fail with `error`.
    pub async fn fail_next(&self, recipient: &str, times: u32, error: &str) {
        self.script
            .lock()
            .await
            .next
            .insert(recipient.to_string(), (times, error.to_string()));
    }

    /// Any message whose content contains `marker` fails with `error`.
    pub async fn fail_when_contains(&self, marker: &str, error: &str) {
        self.script
            .lock()
            .await
            .markers
            .push((marker.to_string(), error.to_string()));
    }

    /// Each call sleeps for `latency` before answering.
    pub async fn set_latency(&self, latency: Duration) {
        *self.latency.lock().await = Some(latency);
    }

    /// Every call, successful or not, in order.
    pub async fn calls(&self) -> Vec<SentMessage> {
        self.calls.lock().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.calls.lock().await.len()
    }

    /// Successful calls only.
    pub async fn sent_messages(&self) -> Vec<SentMessage> {
        self.calls
            .lock()
            .await
            .iter()
            .filter(|c| c.succeeded())
            .cloned()
            .collect()
    }

    /// Successful messages delivered to `recipient`, in order.
    pub async fn sent_to(&self, recipient: &str) -> Vec<OutboundMessage> {
        self.calls
            .lock()
            .await
            .iter()
            .filter(|c| c.succeeded() && c.recipient == recipient)
            .map(|c| c.message.clone())
            .collect()
    }

    pub async fn clear(&self) {
        self.calls.lock().await.clear();
    }
}

impl Default for MockSender {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageSender for MockSender {
    fn name(&self) -> &str {
        "mock-sender"
    }

    async fn send(
        &self,
        recipient: &str,
        message: &OutboundMessage,
    ) -> Result<MessageId, CourierError> {
        let latency = *self.latency.lock().await;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let failure = self.script.lock().await.failure_for(recipient, message);
        let message_id = match &failure {
            Some(_) => None,
            None => {
                let n = self.counter.fetch_add(1, Ordering::SeqCst);
                Some(MessageId(format!("mock-msg-{n}")))
            }
        };

        self.calls.lock().await.push(SentMessage {
            recipient: recipient.to_string(),
            message: message.clone(),
            message_id: message_id.clone(),
        });

        match (failure, message_id) {
            (Some(error), _) => Err(CourierError::channel(error)),
            (None, Some(id)) => Ok(id),
            (None, None) => Err(CourierError::Internal("mock sender produced no id".into())),
        }
    }
}
