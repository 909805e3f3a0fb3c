//! Files written after a run.
//!
//! - [`json`]: one JSON report per published post, for auditing what the
//!   scheduled runs did
//!
//! ```text
//! report_dir/
//! └── 2025-05-06/
//!     └── {item_id}.json
//! ```

pub mod json;
