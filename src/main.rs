//! # HN Tweet Agent
//!
//! A scheduled job that picks the highest-ranked Hacker News story not yet
//! handled by an earlier run, has a language model summarize it, and posts
//! the summary to X, optionally with a generated illustration.
//!
//! ## Usage
//!
//! ```sh
//! hn_tweet_agent --with-image --report-dir ./reports
//! ```
//!
//! ## Architecture
//!
//! 1. **Selection**: ranked ids are checked against a shared visited set;
//!    the first unvisited id is claimed before anything else happens
//! 2. **Extraction**: the story page is reduced to plain article text
//! 3. **Agent**: the model calls the story and posting tools
//! 4. **Report**: what was posted is written as JSON when asked
//!
//! Each invocation handles at most one story. Retrying is left to the
//! scheduler, so every failure ends the process with a non-zero status,
//! except finding nothing new to post.

use clap::Parser;
use std::error::Error;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod agent;
mod api;
mod cli;
mod clients;
mod config;
mod constants;
mod error;
mod extractor;
mod models;
mod outputs;
mod publish;
mod run;
mod selector;
mod sources;
mod tools;
mod utils;
mod visited;

use cli::Cli;
use outputs::json;
use run::RunOptions;
use utils::ensure_writable_dir;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // Before tracing, so RUST_LOG may come from .env too.
    let dotenv = dotenvy::dotenv();

    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!(version = env!("CARGO_PKG_VERSION"), "hn_tweet_agent starting up");
    match dotenv {
        Ok(path) => debug!(path = %path.display(), "Loaded .env"),
        Err(e) if e.not_found() => debug!("No .env file"),
        Err(e) => warn!(error = %e, "Ignoring unreadable .env"),
    }

    let args = Cli::parse();
    debug!(
        ?args.config,
        ?args.report_dir,
        limit = args.limit,
        with_image = args.with_image,
        dry_run = args.dry_run,
        "Parsed CLI arguments"
    );

    let config = config::load(args.config.as_deref())?;

    // Early check, so a bad path fails before a story is consumed
    if let Some(ref dir) = args.report_dir {
        if let Err(e) = ensure_writable_dir(dir).await {
            error!(
                path = %dir,
                error = %e,
                "Report directory is not writable (fix perms or choose a different path)"
            );
            return Err(e);
        }
    }

    let services = run::connect(&args, &config).inspect_err(|e| error!(error = %e, "Cannot start run"))?;

    let record = match run::run(&config, RunOptions::from(&args), &services).await {
        Ok(record) => record,
        Err(e) if e.is_not_found() => {
            info!(reason = %e, "Nothing new to post");
            return Ok(());
        }
        Err(e) => {
            error!(error = %e, elapsed_ms = start_time.elapsed().as_millis() as u64, "Run failed");
            return Err(e.into());
        }
    };

    match (record, args.report_dir.as_deref()) {
        (Some(record), Some(dir)) => {
            json::write_post_record(&record, dir).await?;
        }
        (Some(record), None) => {
            debug!(item_id = %record.item_id, "No report dir; skipping run report");
        }
        (None, _) => warn!("Run ended without a post"),
    }

    info!(elapsed_ms = start_time.elapsed().as_millis() as u64, "hn_tweet_agent finished");
    Ok(())
}
