//! JSON run reports.
//!
//! One file per published post, grouped by the local date of the run:
//! ```text
//! report_dir/
//! └── 2025-05-06/
//!     ├── 43901234.json
//!     └── 43905678.json
//! ```

use crate::models::PostRecord;
use chrono::Local;
use std::error::Error;
use std::path::PathBuf;
use tokio::fs;
use tracing::{error, info, instrument};

/// Write a [`PostRecord`] to `{report_dir}/{local date}/{item id}.json`.
///
/// Returns the path written.
#[instrument(level = "info", skip_all, fields(report_dir = %report_dir, item_id = %record.item_id))]
pub async fn write_post_record(
    record: &PostRecord,
    report_dir: &str,
) -> Result<PathBuf, Box<dyn Error>> {
    let json = serde_json::to_string_pretty(record)?;

    let day_dir = PathBuf::from(report_dir).join(Local::now().date_naive().to_string());
    if let Err(e) = fs::create_dir_all(&day_dir).await {
        error!(path = %day_dir.display(), error = %e, "Failed to create report dir");
        return Err(e.into());
    }

    let path = day_dir.join(format!("{}.json", record.item_id));
    fs::write(&path, json).await?;
    info!(path = %path.display(), "Wrote run report");

    Ok(path)
}
