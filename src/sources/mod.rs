//! Ranked-list sources.
//!
//! A source follows a two-phase pattern:
//!
//! 1. **Ranking**: fetch the current ordered list of story ids
//! 2. **Lookup**: fetch title and URL for one chosen id
//!
//! Only one id is looked up per run, after the selector has picked it, so
//! ranking must be cheap and lookup is never fanned out.
//!
//! | Source | Module | Notes |
//! |--------|--------|-------|
//! | Hacker News | [`hacker_news`] | Firebase API, no auth |

pub mod hacker_news;

use crate::error::Result;
use crate::models::{ItemDetails, ItemId};
use async_trait::async_trait;

/// An externally ranked list of items, highest priority first.
#[async_trait]
pub trait RankedSource: Send + Sync {
    /// Current ranking. Order is significant and must be preserved.
    async fn ranked_ids(&self) -> Result<Vec<ItemId>>;

    /// Title and URL of one item.
    async fn item(&self, id: &ItemId) -> Result<ItemDetails>;
}
