// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transport used by `--dry-run`: logs every message instead of sending it.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use courier_core::{CourierError, MessageId, MessageSender, OutboundMessage};
use tracing::info;

#[derive(Debug, Default)]
pub struct LogSender {
    counter: AtomicU64,
}

impl LogSender {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MessageSender for LogSender {
    fn name(&self) -> &str {
        "dry-run"
    }

    async fn send(
        &self,
        recipient: &str,
        message: &OutboundMessage,
    ) -> Result<MessageId, CourierError> {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        let body = serde_json::to_string(message)?;
        info!(recipient = %recipient, kind = %message.kind(), message = %body, "dry-run send");
        Ok(MessageId(format!("dry-run-{n}")))
    }
}
