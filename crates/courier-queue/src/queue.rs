// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-recipient FIFO of content awaiting unlock.
//!
//! Every mutation is a read-modify-write of the recipient's whole document,
//! performed while holding that recipient's async mutex. Different
//! recipients never contend.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use courier_core::{CourierError, MessageId};
use rand::Rng;
use rand::distributions::Alphanumeric;
use tracing::{debug, info};

use crate::locks::{KeyGuard, KeyedLocks};
use crate::store::QueueStore;
use crate::types::{ContentBundle, ItemStatus, QueuedContentItem, RecipientQueue};

/// Durable per-recipient content queue.
#[derive(Clone)]
pub struct ContentQueue {
    store: Arc<dyn QueueStore>,
    locks: KeyedLocks,
}

impl std::fmt::Debug for ContentQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentQueue")
            .field("locked_keys", &self.locks.len())
            .finish()
    }
}

impl ContentQueue {
    pub fn new(store: Arc<dyn QueueStore>) -> Self {
        Self {
            store,
            locks: KeyedLocks::new(),
        }
    }

    /// Locks the document `key` is stored under.
    async fn lock(&self, key: &str) -> KeyGuard {
        self.locks.lock(&self.store.document_key(key)).await
    }

    /// Appends `bundle` as a new PENDING item and returns it.
    pub async fn enqueue(
        &self,
        key: &str,
        bundle: ContentBundle,
    ) -> Result<QueuedContentItem, CourierError> {
        self.enqueue_at(key, bundle, Utc::now()).await
    }

    /// [`enqueue`](Self::enqueue) with an explicit queue timestamp.
    pub async fn enqueue_at(
        &self,
        key: &str,
        bundle: ContentBundle,
        now: DateTime<Utc>,
    ) -> Result<QueuedContentItem, CourierError> {
        let _guard = self.lock(key).await;
        let mut queue = self.store.load(key).await?;

        let item = QueuedContentItem {
            id: new_item_id(now),
            recipient_key: key.to_string(),
            date: bundle.date.unwrap_or_else(|| now.date_naive()),
            payload: bundle,
            status: ItemStatus::Pending,
            queued_at: now,
            delivered_at: None,
            linked_trigger_message_id: None,
        };
        queue.pending.push(item.clone());
        self.store.save(key, &queue).await?;

        info!(
            recipient = %key,
            item_id = %item.id,
            posts = item.payload.posts.len(),
            pending = queue.pending.len(),
            "content enqueued"
        );
        Ok(item)
    }

    /// PENDING items for `key`, oldest first.
    ///
    /// With `item_id`, returns at most that one item; an absent or already
    /// delivered id yields an empty list.
    pub async fn pending(
        &self,
        key: &str,
        item_id: Option<&str>,
    ) -> Result<Vec<QueuedContentItem>, CourierError> {
        let _guard = self.lock(key).await;
        let queue = self.store.load(key).await?;
        let items = queue
            .pending
            .into_iter()
            .filter(|item| item.is_pending())
            .filter(|item| item_id.is_none_or(|id| item.id == id))
            .collect();
        Ok(items)
    }

    /// Delivered history for `key`, in delivery order.
    pub async fn delivered(&self, key: &str) -> Result<Vec<QueuedContentItem>, CourierError> {
        let _guard = self.lock(key).await;
        Ok(self.store.load(key).await?.delivered)
    }

    /// Moves a pending item to the delivered history.
    ///
    /// Returns the updated item, or `None` when the id is not pending
    /// (already delivered or unknown), in which case nothing is written.
    pub async fn mark_delivered(
        &self,
        key: &str,
        item_id: &str,
    ) -> Result<Option<QueuedContentItem>, CourierError> {
        self.mark_delivered_at(key, item_id, Utc::now()).await
    }

    pub async fn mark_delivered_at(
        &self,
        key: &str,
        item_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<QueuedContentItem>, CourierError> {
        let _guard = self.lock(key).await;
        let mut queue = self.store.load(key).await?;

        let Some(pos) = queue.pending.iter().position(|item| item.id == item_id) else {
            debug!(recipient = %key, item_id, "mark_delivered: item not pending");
            return Ok(None);
        };
        let mut item = queue.pending.remove(pos);
        item.status = ItemStatus::Delivered;
        item.delivered_at = Some(now);
        queue.delivered.push(item.clone());
        self.store.save(key, &queue).await?;

        info!(recipient = %key, item_id, "content marked delivered");
        Ok(Some(item))
    }

    /// Records the notification message id that can unlock `item_id`.
    ///
    /// Status is unchanged. Returns `false` when the item does not exist.
    pub async fn link_trigger_message(
        &self,
        key: &str,
        item_id: &str,
        message_id: &MessageId,
    ) -> Result<bool, CourierError> {
        let _guard = self.lock(key).await;
        let mut queue = self.store.load(key).await?;

        let found = queue
            .pending
            .iter_mut()
            .chain(queue.delivered.iter_mut())
            .find(|item| item.id == item_id);
        match found {
            Some(item) => {
                item.linked_trigger_message_id = Some(message_id.0.clone());
            }
            None => {
                debug!(recipient = %key, item_id, "link_trigger_message: unknown item");
                return Ok(false);
            }
        }
        self.store.save(key, &queue).await?;
        debug!(recipient = %key, item_id, message_id = %message_id, "trigger message linked");
        Ok(true)
    }

    /// The raw document for `key`.
    pub async fn snapshot(&self, key: &str) -> Result<RecipientQueue, CourierError> {
        let _guard = self.lock(key).await;
        self.store.load(key).await
    }
}

/// `content_<unix-millis>_<9 lowercase alphanumerics>`.
fn new_item_id(now: DateTime<Utc>) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(9)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect();
    format!("content_{}_{suffix}", now.timestamp_millis())
}
