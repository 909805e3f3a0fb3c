//! Command-line interface.
//!
//! Credentials are read from the environment (or a `.env` file loaded at
//! startup) through clap's `env` support; flags only change run behaviour.

use crate::clients::twitter::TwitterCredentials;
use crate::constants::TOP_SLICE;
use crate::error::{Result, RunError};
use clap::Parser;

/// Summarize the top unvisited Hacker News story and post it.
///
/// # Examples
///
/// ```sh
/// # Post text only
/// hn_tweet_agent
///
/// # Post with a generated illustration, keeping a JSON record of the run
/// hn_tweet_agent --with-image --report-dir ./reports
///
/// # Try a prompt change without posting or marking anything visited
/// hn_tweet_agent --dry-run -c ./config.yaml
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to config.yaml file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Attach a generated illustration to the post
    #[arg(long)]
    pub with_image: bool,

    /// Log the post instead of publishing it and leave the visited set untouched
    #[arg(long)]
    pub dry_run: bool,

    /// Directory for per-run JSON reports
    #[arg(short, long)]
    pub report_dir: Option<String>,

    /// How many top-ranked stories to consider
    #[arg(short, long, default_value_t = TOP_SLICE)]
    pub limit: usize,

    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,

    #[arg(long, env = "UPSTASH_REDIS_REST_URL")]
    pub upstash_url: Option<String>,

    #[arg(long, env = "UPSTASH_REDIS_REST_TOKEN", hide_env_values = true)]
    pub upstash_token: Option<String>,

    /// OAuth 1.0a consumer (API) key of the posting app
    #[arg(long, env = "TWITTER_CONSUMER_KEY", hide_env_values = true)]
    pub twitter_consumer_key: Option<String>,

    #[arg(long, env = "TWITTER_CONSUMER_SECRET", hide_env_values = true)]
    pub twitter_consumer_secret: Option<String>,

    /// OAuth 1.0a access token of the posting account, with write access
    #[arg(long, env = "TWITTER_ACCESS_TOKEN", hide_env_values = true)]
    pub twitter_access_token: Option<String>,

    #[arg(long, env = "TWITTER_ACCESS_TOKEN_SECRET", hide_env_values = true)]
    pub twitter_access_token_secret: Option<String>,

    /// Only needed with --with-image
    #[arg(long, env = "IDEOGRAM_API_KEY", hide_env_values = true)]
    pub ideogram_api_key: Option<String>,
}

/// Credentials a run needs, all present.
#[derive(Clone)]
pub struct Credentials {
    pub openai_api_key: String,
    pub upstash_url: String,
    pub upstash_token: String,
    /// Absent in dry runs.
    pub twitter: Option<TwitterCredentials>,
    /// Present exactly when an image is requested.
    pub ideogram_api_key: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("upstash_url", &self.upstash_url)
            .finish_non_exhaustive()
    }
}

fn required(value: &Option<String>, var: &str) -> Result<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| RunError::Config(format!("{var} is not set")))
}

impl Cli {
    /// Check that every credential this run will use is set.
    ///
    /// The X credentials are not required for `--dry-run`; the image key is
    /// only required with `--with-image`.
    pub fn credentials(&self) -> Result<Credentials> {
        Ok(Credentials {
            openai_api_key: required(&self.openai_api_key, "OPENAI_API_KEY")?,
            upstash_url: required(&self.upstash_url, "UPSTASH_REDIS_REST_URL")?,
            upstash_token: required(&self.upstash_token, "UPSTASH_REDIS_REST_TOKEN")?,
            twitter: if self.dry_run {
                None
            } else {
                Some(TwitterCredentials {
                    consumer_key: required(&self.twitter_consumer_key, "TWITTER_CONSUMER_KEY")?,
                    consumer_secret: required(&self.twitter_consumer_secret, "TWITTER_CONSUMER_SECRET")?,
                    access_token: required(&self.twitter_access_token, "TWITTER_ACCESS_TOKEN")?,
                    access_token_secret: required(
                        &self.twitter_access_token_secret,
                        "TWITTER_ACCESS_TOKEN_SECRET",
                    )?,
                })
            },
            ideogram_api_key: if self.with_image {
                Some(required(&self.ideogram_api_key, "IDEOGRAM_API_KEY")?)
            } else {
                None
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_all_credentials(args: &[&str]) -> Cli {
        let mut argv = vec![
            "hn_tweet_agent",
            "--openai-api-key",
            "sk-test",
            "--upstash-url",
            "https://redis.test",
            "--upstash-token",
            "redis-token",
            "--twitter-consumer-key",
            "x-ck",
            "--twitter-consumer-secret",
            "x-cs",
            "--twitter-access-token",
            "x-token",
            "--twitter-access-token-secret",
            "x-token-secret",
            "--ideogram-api-key",
            "ideo-key",
        ];
        argv.extend_from_slice(args);
        Cli::parse_from(argv)
    }

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["hn_tweet_agent"]);
        assert_eq!(cli.limit, TOP_SLICE);
        assert!(!cli.with_image);
        assert!(!cli.dry_run);
        assert_eq!(cli.report_dir, None);
    }

    #[test]
    fn test_cli_short_flags() {
        let cli = Cli::parse_from(["hn_tweet_agent", "-c", "/tmp/c.yaml", "-r", "/tmp/r", "-l", "10"]);
        assert_eq!(cli.config.as_deref(), Some("/tmp/c.yaml"));
        assert_eq!(cli.report_dir.as_deref(), Some("/tmp/r"));
        assert_eq!(cli.limit, 10);
    }

    #[test]
    fn test_credentials_for_text_post() {
        let creds = with_all_credentials(&[]).credentials().unwrap();
        let twitter = creds.twitter.unwrap();
        assert_eq!(twitter.consumer_key, "x-ck");
        assert_eq!(twitter.consumer_secret, "x-cs");
        assert_eq!(twitter.access_token, "x-token");
        assert_eq!(twitter.access_token_secret, "x-token-secret");
        assert_eq!(creds.ideogram_api_key, None);
    }

    #[test]
    fn test_image_key_only_with_image() {
        let creds = with_all_credentials(&["--with-image"]).credentials().unwrap();
        assert_eq!(creds.ideogram_api_key.as_deref(), Some("ideo-key"));
    }

    #[test]
    fn test_dry_run_needs_no_posting_token() {
        let mut cli = with_all_credentials(&["--dry-run"]);
        cli.twitter_consumer_key = None;
        cli.twitter_consumer_secret = None;
        cli.twitter_access_token = None;
        cli.twitter_access_token_secret = None;
        let creds = cli.credentials().unwrap();
        assert!(creds.twitter.is_none());
    }

    #[test]
    fn test_every_x_credential_is_required_to_post() {
        let mut cli = with_all_credentials(&[]);
        cli.twitter_access_token_secret = None;
        let err = cli.credentials().unwrap_err();
        assert!(matches!(err, RunError::Config(ref m) if m.contains("TWITTER_ACCESS_TOKEN_SECRET")));

        let mut cli = with_all_credentials(&[]);
        cli.twitter_consumer_secret = Some(String::new());
        let err = cli.credentials().unwrap_err();
        assert!(matches!(err, RunError::Config(ref m) if m.contains("TWITTER_CONSUMER_SECRET")));
    }

    #[test]
    fn test_missing_or_blank_credential_is_config_error() {
        let mut cli = with_all_credentials(&[]);
        cli.upstash_token = Some("  ".to_string());
        let err = cli.credentials().unwrap_err();
        assert!(matches!(err, RunError::Config(ref m) if m.contains("UPSTASH_REDIS_REST_TOKEN")));

        cli.upstash_token = Some("t".to_string());
        cli.with_image = true;
        cli.ideogram_api_key = None;
        assert!(matches!(cli.credentials(), Err(RunError::Config(_))));
    }

    #[test]
    fn test_credentials_debug_hides_secrets() {
        let creds = with_all_credentials(&[]).credentials().unwrap();
        let debug = format!("{creds:?}");
        assert!(!debug.contains("sk-test"));
        assert!(!debug.contains("x-token"));
        assert!(!debug.contains("x-cs"));
    }
}
