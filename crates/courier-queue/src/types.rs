// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Queue item and content bundle types.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;

/// One post of a content bundle, as delivered on unlock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformPost {
    /// Target platform label shown in the unlock introduction ("linkedin", "x").
    #[serde(default)]
    pub platform: String,
    pub text: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub hashtags: Vec<String>,
}

impl PlatformPost {
    /// The post text with its hashtags appended on a trailing line.
    pub fn rendered_text(&self) -> String {
        if self.hashtags.is_empty() {
            return self.text.clone();
        }
        let tags: Vec<String> = self
            .hashtags
            .iter()
            .map(|t| {
                if t.starts_with('#') {
                    t.clone()
                } else {
                    format!("#{t}")
                }
            })
            .collect();
        format!("{}\n\n{}", self.text, tags.join(" "))
    }
}

/// A day's content for one recipient.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ContentBundle {
    /// Content date; defaults to the enqueue date.
    #[serde(default)]
    pub date: Option<NaiveDate>,
    pub posts: Vec<PlatformPost>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemStatus {
    Pending,
    Delivered,
}

/// One queued bundle for one recipient.
///
/// `delivered_at` is set if and only if `status` is [`ItemStatus::Delivered`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedContentItem {
    pub id: String,
    pub recipient_key: String,
    pub date: NaiveDate,
    pub payload: ContentBundle,
    pub status: ItemStatus,
    pub queued_at: DateTime<Utc>,
    #[serde(default)]
    pub delivered_at: Option<DateTime<Utc>>,
    /// Id of the notification message whose button unlocks this item.
    #[serde(default)]
    pub linked_trigger_message_id: Option<String>,
}

impl QueuedContentItem {
    pub fn is_pending(&self) -> bool {
        self.status == ItemStatus::Pending
    }
}

/// The persisted document for one recipient key.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RecipientQueue {
    /// Oldest first.
    #[serde(default)]
    pub pending: Vec<QueuedContentItem>,
    /// Append-only delivery history.
    #[serde(default)]
    pub delivered: Vec<QueuedContentItem>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashtags_are_prefixed_once() {
        let post = PlatformPost {
            platform: "linkedin".into(),
            text: "Rates held steady".into(),
            image_url: None,
            hashtags: vec!["markets".into(), "#RBI".into()],
        };
        assert_eq!(post.rendered_text(), "Rates held steady\n\n#markets #RBI");
    }

    #[test]
    fn post_without_hashtags_is_plain_text() {
        let post = PlatformPost {
            platform: String::new(),
            text: "Plain".into(),
            image_url: None,
            hashtags: vec![],
        };
        assert_eq!(post.rendered_text(), "Plain");
    }

    #[test]
    fn bundle_parses_with_minimal_fields() {
        let bundle: ContentBundle =
            serde_json::from_str(r#"{"posts":[{"text":"hello"}]}"#).unwrap();
        assert!(bundle.date.is_none());
        assert_eq!(bundle.posts[0].text, "hello");
        assert!(bundle.posts[0].hashtags.is_empty());
    }

    #[test]
    fn status_serializes_uppercase() {
        assert_eq!(
            serde_json::to_string(&ItemStatus::Delivered).unwrap(),
            "\"DELIVERED\""
        );
    }
}
