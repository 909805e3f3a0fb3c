//! X API v2 posting, signed with OAuth 1.0a user credentials.
//!
//! Text posts go to `POST /2/tweets`. Images are first uploaded with
//! `POST /2/media/upload` (multipart) and then referenced by media id.
//! Neither body is form-encoded, so only the `oauth_*` parameters are signed.

use super::ensure_success;
use crate::error::{Result, RunError};
use crate::publish::{Image, PostedTweet, Poster};
use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::AUTHORIZATION;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{info, instrument};

pub const DEFAULT_BASE_URL: &str = "https://api.x.com";

#[derive(Debug, Serialize)]
struct CreateTweet<'a> {
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    media: Option<TweetMedia>,
}

#[derive(Debug, Serialize)]
struct TweetMedia {
    media_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct DataEnvelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct CreatedTweet {
    id: String,
    text: String,
}

#[derive(Debug, Deserialize)]
struct UploadedMedia {
    id: String,
}

/// The four OAuth 1.0a secrets of the posting account.
#[derive(Clone)]
pub struct TwitterCredentials {
    pub consumer_key: String,
    pub consumer_secret: String,
    pub access_token: String,
    pub access_token_secret: String,
}

impl std::fmt::Debug for TwitterCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwitterCredentials")
            .field("consumer_key", &"<set>")
            .field("consumer_secret", &"<set>")
            .field("access_token", &"<set>")
            .field("access_token_secret", &"<set>")
            .finish()
    }
}

pub struct TwitterClient {
    http: Client,
    base_url: String,
    token: oauth::Token<String>,
}

impl std::fmt::Debug for TwitterClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwitterClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl TwitterClient {
    pub fn new(http: Client, base_url: impl Into<String>, credentials: TwitterCredentials) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: oauth::Token::from_parts(
                credentials.consumer_key,
                credentials.consumer_secret,
                credentials.access_token,
                credentials.access_token_secret,
            ),
        }
    }

    /// `Authorization` header for a POST to `url`, with a fresh nonce and timestamp.
    fn authorization(&self, url: &str) -> String {
        oauth::post(url, &(), &self.token, oauth::HMAC_SHA1)
    }

    #[instrument(level = "info", skip_all, fields(bytes = image.bytes.len(), mime = %image.mime))]
    async fn upload_media(&self, image: Image) -> Result<String> {
        let t0 = Instant::now();
        let Image { bytes, mime } = image;
        let part = Part::bytes(bytes)
            .file_name("illustration")
            .mime_str(&mime)
            .map_err(|e| RunError::Fetch(format!("image host sent unusable MIME type {mime:?}: {e}")))?;
        let form = Form::new()
            .part("media", part)
            .text("media_category", "tweet_image");

        let url = format!("{}/2/media/upload", self.base_url);
        let response = self
            .http
            .post(&url)
            .header(AUTHORIZATION, self.authorization(&url))
            .multipart(form)
            .send()
            .await?;
        let response = ensure_success(response, "media upload").await?;
        let uploaded: DataEnvelope<UploadedMedia> = parse_body("media upload", &response.text().await?)?;

        info!(
            media_id = %uploaded.data.id,
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Uploaded media"
        );
        Ok(uploaded.data.id)
    }

    #[instrument(level = "info", skip_all, fields(chars = text.chars().count()))]
    async fn create_tweet(&self, text: &str, media_ids: Vec<String>) -> Result<PostedTweet> {
        let body = CreateTweet {
            text,
            media: (!media_ids.is_empty()).then_some(TweetMedia { media_ids }),
        };
        let url = format!("{}/2/tweets", self.base_url);
        let response = self
            .http
            .post(&url)
            .header(AUTHORIZATION, self.authorization(&url))
            .json(&body)
            .send()
            .await?;
        let response = ensure_success(response, "create tweet").await?;
        let created: DataEnvelope<CreatedTweet> = parse_body("create tweet", &response.text().await?)?;

        info!(tweet_id = %created.data.id, "Posted tweet");
        Ok(PostedTweet {
            id: Some(created.data.id),
            text: created.data.text,
        })
    }
}

fn parse_body<T: serde::de::DeserializeOwned>(what: &str, body: &str) -> Result<T> {
    serde_json::from_str(body).map_err(|e| RunError::Fetch(format!("malformed {what} reply: {e}")))
}

#[async_trait]
impl Poster for TwitterClient {
    async fn post_text(&self, text: &str) -> Result<PostedTweet> {
        self.create_tweet(text, Vec::new()).await
    }

    async fn post_with_image(&self, text: &str, image: Image) -> Result<PostedTweet> {
        let media_id = self.upload_media(image).await?;
        self.create_tweet(text, vec![media_id]).await
    }
}
