// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Content queue for pull-based unlock delivery.
//!
//! Generated content is queued per recipient as PENDING and delivered when
//! the recipient taps the unlock button (or sends an unlock keyword). The
//! queue is the single source of truth for unlock state.

pub mod locks;
pub mod queue;
pub mod store;
pub mod types;

pub use locks::{KeyGuard, KeyedLocks};
pub use queue::ContentQueue;
pub use store::{JsonFileQueueStore, MemoryQueueStore, QueueStore, encode_key};
pub use types::{ContentBundle, ItemStatus, PlatformPost, QueuedContentItem, RecipientQueue};
