//! Optional YAML configuration.
//!
//! Every field has a default, so the binary runs without a config file;
//! a file only needs the keys it overrides:
//!
//! ```yaml
//! model: gpt-4o
//! max_steps: 4
//! visited_key: visited-staging
//! ```
//!
//! Credentials never live here. They come from the environment (see
//! [`crate::cli::Cli`]).

use crate::error::{Result, RunError};
use serde::Deserialize;
use std::time::Duration;
use tracing::{info, instrument};

const BACKGROUND: &str = "You are an AI assistant that helps people stay up-to-date with the \
latest news. You can fetch the top 1 unvisited Hacker News article and post it to Twitter \
using the `top_unvisited_story` and posting tools. You will be called every hour to fetch a \
new article and post it to Twitter. You must create a 250 character tweet summary of the \
article. Provide links in the tweet if possible.";

const TASK: &str = "Fetch the top 1 unvisited Hacker News article and post it to Twitter.";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub model: String,
    pub openai_base_url: String,
    pub hacker_news_base_url: String,
    pub twitter_base_url: String,
    pub ideogram_base_url: String,
    /// Redis set holding visited item ids.
    pub visited_key: String,
    pub request_timeout_secs: u64,
    /// Model turns allowed per run.
    pub max_steps: usize,
    pub background: String,
    pub task: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            openai_base_url: crate::api::DEFAULT_BASE_URL.to_string(),
            hacker_news_base_url: crate::sources::hacker_news::DEFAULT_BASE_URL.to_string(),
            twitter_base_url: crate::clients::twitter::DEFAULT_BASE_URL.to_string(),
            ideogram_base_url: crate::clients::ideogram::DEFAULT_BASE_URL.to_string(),
            visited_key: "visited".to_string(),
            request_timeout_secs: 30,
            max_steps: 3,
            background: BACKGROUND.to_string(),
            task: TASK.to_string(),
        }
    }
}

impl Config {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Parse YAML and check the values that would make a run meaningless.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config =
            serde_yaml::from_str(yaml).map_err(|e| RunError::Config(format!("invalid config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.max_steps == 0 {
            return Err(RunError::Config("max_steps must be at least 1".to_string()));
        }
        if self.request_timeout_secs == 0 {
            return Err(RunError::Config(
                "request_timeout_secs must be at least 1".to_string(),
            ));
        }
        if self.visited_key.trim().is_empty() {
            return Err(RunError::Config("visited_key must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Load the config file at `path`, or the defaults when no path is given.
#[instrument(level = "info", skip_all, fields(path = ?path))]
pub fn load(path: Option<&str>) -> Result<Config> {
    let Some(path) = path else {
        info!("No config file given; using defaults");
        return Ok(Config::default());
    };
    let yaml = std::fs::read_to_string(path)
        .map_err(|e| RunError::Config(format!("cannot read config {path}: {e}")))?;
    let config = Config::from_yaml(&yaml)?;
    info!(model = %config.model, max_steps = config.max_steps, "Loaded configuration");
    Ok(config)
}
