//! One scheduled run: wire the services, let the agent work, report what
//! was posted.
//!
//! # Flow
//!
//! 1. **Credentials** are checked before any network call
//! 2. **Services** are built on one shared HTTP client; `--dry-run` swaps in
//!    a read-only visited set and a logging poster
//! 3. **Agent**: the model fetches the story and posts its summary through
//!    the registered tools
//! 4. **Outcome** is read back from the tool session

use crate::agent::{Agent, AgentReport};
use crate::api::{ChatApi, OpenAiChat};
use crate::cli::Cli;
use crate::clients::{http_client, ideogram::IdeogramClient, twitter::TwitterClient, upstash::UpstashVisitedSet};
use crate::config::Config;
use crate::constants::MAX_CONTENT_LENGTH;
use crate::error::{Result, RunError};
use crate::models::PostRecord;
use crate::publish::{DryRunPoster, ImageGenerator, Poster};
use crate::sources::{RankedSource, hacker_news::HackerNewsClient};
use crate::tools::story::TopStoryTool;
use crate::tools::tweet::{PostTweetTool, PostTweetWithImageTool};
use crate::tools::{Session, SharedSession, Tool, ToolRegistry, lock};
use crate::visited::{ReadOnly, VisitedSet};
use chrono::Utc;
use reqwest::Client;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{info, instrument, warn};

/// Behaviour switches for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    pub limit: usize,
    pub with_image: bool,
    pub dry_run: bool,
}

impl From<&Cli> for RunOptions {
    fn from(cli: &Cli) -> Self {
        Self {
            limit: cli.limit,
            with_image: cli.with_image,
            dry_run: cli.dry_run,
        }
    }
}

/// Everything a run talks to.
pub struct Services<C: ChatApi> {
    pub chat: C,
    pub source: Arc<dyn RankedSource>,
    pub visited: Arc<dyn VisitedSet>,
    pub poster: Arc<dyn Poster>,
    /// Required when the run posts with an image.
    pub images: Option<Arc<dyn ImageGenerator>>,
    pub http: Client,
}

/// Build the production services from validated credentials.
pub fn connect(cli: &Cli, config: &Config) -> Result<Services<OpenAiChat>> {
    let creds = cli.credentials()?;
    let http = http_client(config.request_timeout())?;

    let upstash = UpstashVisitedSet::new(
        http.clone(),
        creds.upstash_url,
        creds.upstash_token,
        config.visited_key.clone(),
    );
    let visited: Arc<dyn VisitedSet> = if cli.dry_run {
        Arc::new(ReadOnly(upstash))
    } else {
        Arc::new(upstash)
    };

    let poster: Arc<dyn Poster> = match creds.twitter {
        Some(twitter) => Arc::new(TwitterClient::new(
            http.clone(),
            config.twitter_base_url.clone(),
            twitter,
        )),
        None => Arc::new(DryRunPoster),
    };

    let images = creds.ideogram_api_key.map(|key| {
        Arc::new(IdeogramClient::new(http.clone(), config.ideogram_base_url.clone(), key))
            as Arc<dyn ImageGenerator>
    });

    Ok(Services {
        chat: OpenAiChat::new(http.clone(), config.openai_base_url.clone(), creds.openai_api_key),
        source: Arc::new(HackerNewsClient::new(http.clone(), config.hacker_news_base_url.clone())),
        visited,
        poster,
        images,
        http,
    })
}

fn registry<C: ChatApi>(
    services: &Services<C>,
    options: RunOptions,
    session: &SharedSession,
) -> Result<ToolRegistry> {
    let registry = ToolRegistry::new().with(TopStoryTool {
        source: services.source.clone(),
        visited: services.visited.clone(),
        http: services.http.clone(),
        limit: options.limit,
        max_content_length: MAX_CONTENT_LENGTH,
        session: session.clone(),
    });

    if !options.with_image {
        return Ok(registry.with(PostTweetTool {
            poster: services.poster.clone(),
            session: session.clone(),
        }));
    }
    let images = services
        .images
        .clone()
        .ok_or_else(|| RunError::Config("image posting requested without an image generator".to_string()))?;
    Ok(registry.with(PostTweetWithImageTool {
        poster: services.poster.clone(),
        images,
        session: session.clone(),
    }))
}

/// Run the agent once and return the record of what it posted.
///
/// `Ok(None)` means the model finished without posting and without a
/// rejected post attempt.
///
/// # Errors
///
/// - [`RunError::NotFound`] when every story in the window was visited
/// - [`RunError::Validation`] when the last post attempt was rejected and
///   the model did not recover within its step budget
/// - any other error from the tools or the model, unchanged
#[instrument(level = "info", skip_all, fields(limit = options.limit, with_image = options.with_image, dry_run = options.dry_run))]
pub async fn run<C: ChatApi>(
    config: &Config,
    options: RunOptions,
    services: &Services<C>,
) -> Result<Option<PostRecord>> {
    let t0 = Instant::now();
    let session: SharedSession = Arc::new(Mutex::new(Session::default()));
    let registry = registry(services, options, &session)?;
    info!(tools = ?registry.names(), "Registered tools");

    let agent = Agent {
        chat: &services.chat,
        model: config.model.clone(),
        background: config.background.clone(),
        registry: &registry,
        max_steps: config.max_steps,
    };
    let report = agent.run(&config.task).await?;

    let outcome = outcome(&session, &report, options)?;
    info!(
        elapsed_ms = t0.elapsed().as_millis() as u64,
        steps = report.steps,
        posted = outcome.is_some(),
        "Run finished"
    );
    Ok(outcome)
}

fn outcome(session: &SharedSession, report: &AgentReport, options: RunOptions) -> Result<Option<PostRecord>> {
    let session = lock(session);
    let (Some((item_id, story)), Some(post)) = (&session.story, &session.post) else {
        let rejected_post = report
            .rejections
            .iter()
            .rev()
            .find(|r| r.tool == PostTweetTool::NAME || r.tool == PostTweetWithImageTool::NAME);
        if let Some(rejection) = rejected_post {
            return Err(RunError::Validation(rejection.message.clone()));
        }
        warn!(
            story_selected = session.story.is_some(),
            final_text = ?report.final_text,
            "Model finished without posting"
        );
        return Ok(None);
    };

    Ok(Some(PostRecord {
        item_id: item_id.clone(),
        title: story.title.clone(),
        url: story.url.clone(),
        tweet: post.tweet.clone(),
        tweet_id: post.tweet_id.clone(),
        with_image: post.with_image,
        dry_run: options.dry_run,
        steps: report.steps,
        posted_at: Utc::now(),
    }))
}
