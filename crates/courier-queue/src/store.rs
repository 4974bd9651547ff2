// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Keyed storage for per-recipient queue documents.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use courier_core::CourierError;
use courier_core::persist;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use tokio::sync::Mutex;
use tracing::debug;

use crate::types::RecipientQueue;

/// Load/save of one recipient's queue document.
///
/// Implementations need not serialize access; [`ContentQueue`](crate::ContentQueue)
/// holds a per-key lock around every read-modify-write.
#[async_trait]
pub trait QueueStore: Send + Sync + 'static {
    /// Returns an empty queue for unknown keys.
    async fn load(&self, key: &str) -> Result<RecipientQueue, CourierError>;

    async fn save(&self, key: &str, queue: &RecipientQueue) -> Result<(), CourierError>;

    /// Identity of the document backing `key`; keys sharing a document share a lock.
    fn document_key(&self, key: &str) -> String {
        key.to_string()
    }
}

/// One JSON file per recipient under a directory.
#[derive(Debug, Clone)]
pub struct JsonFileQueueStore {
    dir: PathBuf,
}

impl JsonFileQueueStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File path for `key`.
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", encode_key(key)))
    }
}

#[async_trait]
impl QueueStore for JsonFileQueueStore {
    async fn load(&self, key: &str) -> Result<RecipientQueue, CourierError> {
        persist::read_json_or_default(&self.path_for(key)).await
    }

    async fn save(&self, key: &str, queue: &RecipientQueue) -> Result<(), CourierError> {
        let path = self.path_for(key);
        debug!(
            path = %path.display(),
            pending = queue.pending.len(),
            delivered = queue.delivered.len(),
            "writing queue document"
        );
        persist::write_json_atomic(&path, queue).await
    }

    fn document_key(&self, key: &str) -> String {
        encode_key(key)
    }
}

/// Bytes left as-is in a file stem; `%` itself is always escaped.
const STEM_SAFE: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_');

/// Maps a recipient key to a file stem, one stem per distinct key.
///
/// ASCII letters, digits, `-` and `_` pass through; every other byte is
/// percent-encoded, so the mapping is reversible and free of path
/// separators. The empty key maps to `%`, which no other key produces.
pub fn encode_key(key: &str) -> String {
    if key.is_empty() {
        return "%".to_string();
    }
    utf8_percent_encode(key, STEM_SAFE).to_string()
}

/// Non-durable store for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryQueueStore {
    queues: Mutex<HashMap<String, RecipientQueue>>,
}

impl MemoryQueueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl QueueStore for MemoryQueueStore {
    async fn load(&self, key: &str) -> Result<RecipientQueue, CourierError> {
        Ok(self.queues.lock().await.get(key).cloned().unwrap_or_default())
    }

    async fn save(&self, key: &str, queue: &RecipientQueue) -> Result<(), CourierError> {
        self.queues
            .lock()
            .await
            .insert(key.to_string(), queue.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_escapes_unsafe_characters() {
        assert_eq!(encode_key("+91 98000-00001"), "%2B91%2098000-00001");
        assert_eq!(encode_key("../etc/passwd"), "%2E%2E%2Fetc%2Fpasswd");
        assert_eq!(encode_key("adv_1"), "adv_1");
        assert_eq!(encode_key(""), "%");
    }

    #[test]
    fn lookalike_keys_get_distinct_stems() {
        let keys = [
            "asha.k@example.com",
            "asha_k_example_com",
            "+91 98000",
            "+91_98000",
            "_91_98000",
            "%2B91",
            "",
            "_",
        ];
        let stems: std::collections::HashSet<_> = keys.iter().map(|k| encode_key(k)).collect();
        assert_eq!(stems.len(), keys.len());
    }

    #[tokio::test]
    async fn file_store_returns_empty_for_unknown_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileQueueStore::new(dir.path());
        let queue = store.load("919800000001").await.unwrap();
        assert_eq!(queue, RecipientQueue::default());
    }

    #[tokio::test]
    async fn file_store_writes_under_encoded_name() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileQueueStore::new(dir.path().join("queue"));
        store
            .save("+919800000001", &RecipientQueue::default())
            .await
            .unwrap();
        assert!(dir.path().join("queue/%2B919800000001.json").exists());
    }
}
