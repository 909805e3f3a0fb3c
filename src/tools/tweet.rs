//! Posting tools: `post_tweet` and `post_tweet_with_image`.

use super::{PostOutcome, SharedSession, Tool, lock};
use crate::constants::TWEET_MAX_CHARS;
use crate::error::{Result, RunError};
use crate::publish::{ImageGenerator, PostedTweet, Poster};
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};

#[derive(Debug, Deserialize, JsonSchema)]
pub struct TweetArgs {
    /// The tweet to post.
    pub tweet: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct TweetWithImageArgs {
    /// The tweet to post.
    pub tweet: String,
    /// A short description of an illustration for the story.
    pub image_prompt: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TweetOutput {
    pub tweet: String,
    pub tweet_id: Option<String>,
}

/// Trimmed post text, rejected when empty or over the length bound.
fn validate_tweet(text: &str) -> Result<String> {
    let text = text.trim();
    if text.is_empty() {
        return Err(RunError::Validation("tweet must not be empty".to_string()));
    }
    let chars = text.chars().count();
    if chars > TWEET_MAX_CHARS {
        return Err(RunError::Validation(format!(
            "tweet is {chars} characters, the limit is {TWEET_MAX_CHARS}"
        )));
    }
    Ok(text.to_string())
}

/// A post needs a selected story, and only one post is made per run.
fn ensure_ready(session: &SharedSession) -> Result<()> {
    let session = lock(session);
    if session.story.is_none() {
        return Err(RunError::Validation(
            "fetch the story with top_unvisited_story before posting".to_string(),
        ));
    }
    if session.post.is_some() {
        return Err(RunError::Validation(
            "a tweet was already posted this run".to_string(),
        ));
    }
    Ok(())
}

fn record(session: &SharedSession, posted: PostedTweet, with_image: bool) -> TweetOutput {
    lock(session).post = Some(PostOutcome {
        tweet: posted.text.clone(),
        tweet_id: posted.id.clone(),
        with_image,
    });
    TweetOutput {
        tweet: posted.text,
        tweet_id: posted.id,
    }
}

pub struct PostTweetTool {
    pub poster: Arc<dyn Poster>,
    pub session: SharedSession,
}

#[async_trait]
impl Tool for PostTweetTool {
    const NAME: &'static str = "post_tweet";
    type Args = TweetArgs;
    type Output = TweetOutput;

    fn description(&self) -> &str {
        "Posts a tweet of at most 250 characters. Call it once, with the finished text."
    }

    #[instrument(level = "info", skip_all, fields(chars = args.tweet.chars().count()))]
    async fn call(&self, args: TweetArgs) -> Result<TweetOutput> {
        let text = validate_tweet(&args.tweet)?;
        ensure_ready(&self.session)?;

        let posted = self.poster.post_text(&text).await?;
        info!(tweet_id = ?posted.id, "Tweet published");
        Ok(record(&self.session, posted, false))
    }
}

pub struct PostTweetWithImageTool {
    pub poster: Arc<dyn Poster>,
    pub images: Arc<dyn ImageGenerator>,
    pub session: SharedSession,
}

#[async_trait]
impl Tool for PostTweetWithImageTool {
    const NAME: &'static str = "post_tweet_with_image";
    type Args = TweetWithImageArgs;
    type Output = TweetOutput;

    fn description(&self) -> &str {
        "Generates an illustration from image_prompt and posts it with a tweet of at \
         most 250 characters. Call it once, with the finished text."
    }

    #[instrument(level = "info", skip_all, fields(chars = args.tweet.chars().count()))]
    async fn call(&self, args: TweetWithImageArgs) -> Result<TweetOutput> {
        let text = validate_tweet(&args.tweet)?;
        let prompt = args.image_prompt.trim();
        if prompt.is_empty() {
            return Err(RunError::Validation("image_prompt must not be empty".to_string()));
        }
        ensure_ready(&self.session)?;

        let image = self.images.generate(prompt).await?;
        let posted = self.poster.post_with_image(&text, image).await?;
        info!(tweet_id = ?posted.id, "Tweet with image published");
        Ok(record(&self.session, posted, true))
    }
}
