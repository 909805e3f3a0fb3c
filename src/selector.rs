//! Picks the highest-ranked story that no earlier run has taken.

use crate::error::{Result, RunError};
use crate::models::{ItemId, RankedItem};
use crate::visited::VisitedSet;
use std::time::Instant;
use tracing::{debug, info, instrument};

/// Select the first of the top `limit` candidates that is not yet visited and
/// mark it visited.
///
/// The membership check is a single batched call. The winning id is written
/// to `visited` before this returns, so a retried run cannot pick the same
/// story even if everything downstream fails.
///
/// # Errors
///
/// - [`RunError::NotFound`] when `limit` is 0, the window is empty, or every
///   candidate in it is already visited. `visited` is left unchanged.
/// - [`RunError::Fetch`] when the store fails, or answers with a different
///   number of flags than ids it was asked about.
#[instrument(level = "info", skip_all, fields(candidates = candidates.len(), limit = limit))]
pub async fn select_next(
    candidates: &[RankedItem],
    limit: usize,
    visited: &dyn VisitedSet,
) -> Result<RankedItem> {
    let window = &candidates[..limit.min(candidates.len())];
    if window.is_empty() {
        return Err(RunError::NotFound { checked: 0 });
    }

    let t0 = Instant::now();
    let ids: Vec<ItemId> = window.iter().map(|item| item.id.clone()).collect();
    let flags = visited.contains_many(&ids).await?;
    if flags.len() != ids.len() {
        return Err(RunError::Fetch(format!(
            "visited set answered {} flags for {} ids",
            flags.len(),
            ids.len()
        )));
    }

    let Some(pos) = flags.iter().position(|seen| !seen) else {
        info!(checked = window.len(), "Every candidate already visited");
        return Err(RunError::NotFound {
            checked: window.len(),
        });
    };
    debug!(skipped = pos, "Skipped visited candidates");

    let selected = window[pos].clone();
    visited.add(&selected.id).await?;

    info!(
        id = %selected.id,
        rank = selected.rank,
        elapsed_ms = t0.elapsed().as_millis() as u64,
        "Selected unvisited item"
    );
    Ok(selected)
}
