//! The remote set of story ids that were already selected by an earlier run.
//!
//! The set is append-only from this program's point of view and is shared by
//! every run, so it is always passed in explicitly as a [`VisitedSet`] rather
//! than reached through a global client.

use crate::error::Result;
use crate::models::ItemId;
use async_trait::async_trait;
use tracing::info;

/// Membership store for already-selected ids.
#[async_trait]
pub trait VisitedSet: Send + Sync {
    /// One boolean per input id, in input order.
    async fn contains_many(&self, ids: &[ItemId]) -> Result<Vec<bool>>;

    /// Insert `id`. Inserting an existing member is not an error.
    async fn add(&self, id: &ItemId) -> Result<()>;
}

/// Wraps a store so membership is read from it but nothing is written.
///
/// Used by `--dry-run`, where the story must stay eligible for the next real
/// run.
#[derive(Debug)]
pub struct ReadOnly<V>(pub V);

#[async_trait]
impl<V: VisitedSet> VisitedSet for ReadOnly<V> {
    async fn contains_many(&self, ids: &[ItemId]) -> Result<Vec<bool>> {
        self.0.contains_many(ids).await
    }

    async fn add(&self, id: &ItemId) -> Result<()> {
        info!(%id, "Dry run: not marking item visited");
        Ok(())
    }
}

#[cfg(test)]
pub(crate) use memory::MemoryVisitedSet;
