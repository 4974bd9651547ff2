// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Click-to-unlock content delivery.
//!
//! Daily content is queued per recipient and announced with a single
//! template notification whose quick-reply button carries
//! `UNLOCK_CONTENT_<item-id>`. Tapping the button (or sending a keyword such
//! as "show content") delivers the pending posts in order with pacing.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use courier_core::{CourierError, MessageId, MessageSender, OutboundMessage};
use courier_queue::{ContentBundle, ContentQueue, KeyedLocks, QueuedContentItem};
use courier_resilience::{BackoffRetrier, classify_error};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::pacing::pause;
use crate::settings::UnlockSettings;

const TRIGGER_PREFIX: &str = "UNLOCK_CONTENT_";
const ALL_TOKEN: &str = "ALL";
const UNLOCK_KEYWORDS: [&str; 3] = ["show", "content", "unlock"];

const NOTHING_PENDING_TEXT: &str =
    "You're all caught up! There is no new content waiting for you right now.";
const COMPLETION_TEXT: &str =
    "That's all your content for now. Reply \"show content\" any time to get anything still pending.";

/// A parsed unlock payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnlockTrigger {
    /// `UNLOCK_CONTENT_<id>`
    Item(String),
    /// `UNLOCK_CONTENT_ALL`
    All,
}

impl UnlockTrigger {
    pub fn item_id(&self) -> Option<&str> {
        match self {
            Self::Item(id) => Some(id),
            Self::All => None,
        }
    }
}

impl fmt::Display for UnlockTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Item(id) => write!(f, "{TRIGGER_PREFIX}{id}"),
            Self::All => write!(f, "{TRIGGER_PREFIX}{ALL_TOKEN}"),
        }
    }
}

impl FromStr for UnlockTrigger {
    type Err = CourierError;

    fn from_str(payload: &str) -> Result<Self, Self::Err> {
        let rest = payload
            .trim()
            .strip_prefix(TRIGGER_PREFIX)
            .filter(|rest| !rest.is_empty())
            .ok_or_else(|| {
                CourierError::NotFound(format!("unlock trigger in payload {payload:?}"))
            })?;
        if rest == ALL_TOKEN {
            Ok(Self::All)
        } else {
            Ok(Self::Item(rest.to_string()))
        }
    }
}

/// Result of sending a daily notification.
#[derive(Debug, Clone)]
pub struct Notification {
    pub item: QueuedContentItem,
    pub message_id: MessageId,
}

/// Result of handling one unlock trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnlockOutcome {
    /// Nothing matched; the courtesy message was sent.
    NothingPending,
    Delivered(DeliverySummary),
}

/// Per-item results of [`UnlockOrchestrator::deliver_content`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliverySummary {
    /// Items fully sent and marked DELIVERED.
    pub delivered: Vec<String>,
    /// Items that hit a send failure and stay PENDING.
    pub failed: Vec<String>,
}

/// Pull-based delivery driven by inbound unlock triggers.
pub struct UnlockOrchestrator {
    sender: Arc<dyn MessageSender>,
    queue: ContentQueue,
    settings: UnlockSettings,
    retrier: BackoffRetrier,
    cancel: CancellationToken,
    recipient_locks: KeyedLocks,
}

impl fmt::Debug for UnlockOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnlockOrchestrator")
            .field("sender", &self.sender.name())
            .field("settings", &self.settings)
            .field("busy_recipients", &self.recipient_locks.len())
            .finish()
    }
}

impl UnlockOrchestrator {
    pub fn new(sender: Arc<dyn MessageSender>, queue: ContentQueue, settings: UnlockSettings) -> Self {
        Self {
            retrier: settings.retrier(),
            sender,
            queue,
            settings,
            cancel: CancellationToken::new(),
            recipient_locks: KeyedLocks::new(),
        }
    }

    /// Backoff and pacing waits end early when `cancel` fires.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn queue(&self) -> &ContentQueue {
        &self.queue
    }

    /// Queues `bundle` and sends the notification that can unlock it.
    ///
    /// The item stays PENDING even if the notification fails, so a keyword
    /// unlock still reaches it.
    pub async fn send_daily_notification(
        &self,
        recipient: &str,
        bundle: ContentBundle,
    ) -> Result<Notification, CourierError> {
        let item = self.queue.enqueue(recipient, bundle).await?;
        let trigger = UnlockTrigger::Item(item.id.clone());

        let message = OutboundMessage::Template {
            name: self.settings.notification_template.clone(),
            language: self.settings.template_language.clone(),
            params: vec![
                item.date.format("%d %b %Y").to_string(),
                item.payload.posts.len().to_string(),
            ],
            button_payload: Some(trigger.to_string()),
        };
        let message_id = self.send(recipient, &message).await?;
        self.queue
            .link_trigger_message(recipient, &item.id, &message_id)
            .await?;

        info!(
            recipient = %recipient,
            item_id = %item.id,
            message_id = %message_id,
            "daily notification sent"
        );
        Ok(Notification { item, message_id })
    }

    /// Handles a button payload (`UNLOCK_CONTENT_<id>` or `UNLOCK_CONTENT_ALL`).
    ///
    /// Triggers for the same recipient are handled one at a time.
    pub async fn handle_unlock_trigger(
        &self,
        recipient: &str,
        payload: &str,
    ) -> Result<UnlockOutcome, CourierError> {
        let trigger: UnlockTrigger = payload.parse()?;
        let _guard = self.recipient_locks.lock(recipient).await;

        let items = self.queue.pending(recipient, trigger.item_id()).await?;
        info!(
            recipient = %recipient,
            trigger = %trigger,
            items = items.len(),
            "unlock trigger received"
        );

        if items.is_empty() {
            self.send(recipient, &OutboundMessage::text(NOTHING_PENDING_TEXT))
                .await?;
            return Ok(UnlockOutcome::NothingPending);
        }

        let summary = self.deliver_content(recipient, &items).await?;
        Ok(UnlockOutcome::Delivered(summary))
    }

    /// Free-text fallback: keywords unlock everything pending.
    ///
    /// Returns `None` when the text is not an unlock request.
    pub async fn handle_inbound_text(
        &self,
        recipient: &str,
        text: &str,
    ) -> Result<Option<UnlockOutcome>, CourierError> {
        let trimmed = text.trim();
        if trimmed.starts_with(TRIGGER_PREFIX) {
            return self.handle_unlock_trigger(recipient, trimmed).await.map(Some);
        }
        if !is_unlock_keyword(trimmed) {
            debug!(recipient = %recipient, "inbound text is not an unlock request");
            return Ok(None);
        }
        self.handle_unlock_trigger(recipient, &UnlockTrigger::All.to_string())
            .await
            .map(Some)
    }

    /// Sends `items` in order and marks each fully sent item DELIVERED.
    ///
    /// A failed post leaves its item PENDING (posts already sent are not
    /// recalled) and delivery moves on to the next item.
    pub async fn deliver_content(
        &self,
        recipient: &str,
        items: &[QueuedContentItem],
    ) -> Result<DeliverySummary, CourierError> {
        let mut summary = DeliverySummary::default();

        for item in items {
            match self.deliver_item(recipient, item).await {
                Ok(()) => {
                    self.queue.mark_delivered(recipient, &item.id).await?;
                    summary.delivered.push(item.id.clone());
                }
                Err(e) if e.is_cancelled() => return Err(e),
                Err(e) => {
                    warn!(
                        recipient = %recipient,
                        item_id = %item.id,
                        category = %classify_error(&e),
                        error = %e,
                        "unlock delivery interrupted, item stays pending"
                    );
                    summary.failed.push(item.id.clone());
                }
            }
        }

        if let Err(e) = self
            .send(recipient, &OutboundMessage::text(COMPLETION_TEXT))
            .await
        {
            if e.is_cancelled() {
                return Err(e);
            }
            warn!(recipient = %recipient, error = %e, "completion message failed");
        }

        info!(
            recipient = %recipient,
            delivered = summary.delivered.len(),
            failed = summary.failed.len(),
            "unlock delivery finished"
        );
        Ok(summary)
    }

    async fn deliver_item(&self, recipient: &str, item: &QueuedContentItem) -> Result<(), CourierError> {
        let posts = &item.payload.posts;
        self.send(recipient, &OutboundMessage::text(introduction(item)))
            .await?;
        pause(&self.cancel, self.settings.intro_pacing).await?;

        for (idx, post) in posts.iter().enumerate() {
            self.send(recipient, &OutboundMessage::text(post.rendered_text()))
                .await?;
            if let Some(url) = &post.image_url {
                self.send(recipient, &OutboundMessage::image(url.clone(), None))
                    .await?;
            }
            debug!(recipient = %recipient, item_id = %item.id, post = idx + 1, "post sent");
            if idx + 1 < posts.len() {
                pause(&self.cancel, self.settings.post_pacing).await?;
            }
        }
        Ok(())
    }

    async fn send(&self, recipient: &str, message: &OutboundMessage) -> Result<MessageId, CourierError> {
        self.retrier
            .send(&self.cancel, || self.sender.send(recipient, message))
            .await
            .map(|sent| sent.value)
            .map_err(|failure| failure.error)
    }
}

/// Intro text sent ahead of an item's posts, naming their platforms when labelled.
fn introduction(item: &QueuedContentItem) -> String {
    let posts = &item.payload.posts;
    let noun = if posts.len() == 1 { "post" } else { "posts" };
    let mut text = format!(
        "Here is your content for {} ({} {noun}).",
        item.date.format("%d %b %Y"),
        posts.len()
    );

    let mut platforms: Vec<&str> = Vec::new();
    for label in posts.iter().map(|p| p.platform.trim()) {
        if !label.is_empty() && !platforms.iter().any(|seen| seen.eq_ignore_ascii_case(label)) {
            platforms.push(label);
        }
    }
    if !platforms.is_empty() {
        text.push_str(&format!(" Platforms: {}.", platforms.join(", ")));
    }
    text
}

fn is_unlock_keyword(text: &str) -> bool {
    let lower = text.to_lowercase();
    UNLOCK_KEYWORDS.iter().any(|k| lower.contains(k))
}
