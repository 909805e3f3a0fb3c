//! Data models for ranked stories, extracted article text and run reports.
//!
//! - [`ItemId`]: opaque identifier assigned by the ranked-list source
//! - [`RankedItem`]: one entry of the ranked list, lives for one selection cycle
//! - [`ItemDetails`]: per-item metadata from the secondary lookup
//! - [`ExtractedContent`]: what the summarizer sees
//! - [`PostRecord`]: what a run published, written to the optional report dir

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier of a story, unique per source.
///
/// Hacker News hands out integers; they are stored in the visited set in
/// their decimal string form, so the id is kept as a string here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<u64> for ItemId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One entry of the externally ranked list.
///
/// The ranked-list fetch only yields ids, so `url` and `title` start out
/// empty and are filled by [`RankedItem::with_details`] after selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedItem {
    pub id: ItemId,
    /// 0-based position in the fetched list.
    pub rank: usize,
    pub url: Option<String>,
    pub title: Option<String>,
}

impl RankedItem {
    pub fn new(id: ItemId, rank: usize) -> Self {
        Self {
            id,
            rank,
            url: None,
            title: None,
        }
    }

    /// Build the ranked list from ids in their source order.
    pub fn from_ids(ids: impl IntoIterator<Item = ItemId>) -> Vec<RankedItem> {
        ids.into_iter()
            .enumerate()
            .map(|(rank, id)| RankedItem::new(id, rank))
            .collect()
    }

    pub fn with_details(self, details: ItemDetails) -> Self {
        Self {
            url: details.url.filter(|u| !u.trim().is_empty()),
            title: details.title,
            ..self
        }
    }
}

/// Metadata returned by the per-item lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ItemDetails {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

/// Article record handed to the summarizer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedContent {
    pub title: String,
    pub url: Option<String>,
    pub content: String,
}

/// What a run published.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostRecord {
    pub item_id: ItemId,
    pub title: String,
    pub url: Option<String>,
    pub tweet: String,
    pub tweet_id: Option<String>,
    pub with_image: bool,
    pub dry_run: bool,
    pub steps: usize,
    pub posted_at: DateTime<Utc>,
}
