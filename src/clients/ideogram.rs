//! Ideogram image generation.
//!
//! The style is fixed (see [`crate::constants`]); only the prompt varies per
//! run. Ideogram answers with a short-lived URL, which is downloaded right
//! away so the bytes can be re-uploaded to the posting API.

use super::ensure_success;
use crate::constants::{IMAGE_ASPECT_RATIO, IMAGE_COLOR_PALETTE, IMAGE_MODEL, IMAGE_STYLE_TYPE};
use crate::error::{Result, RunError};
use crate::publish::{Image, ImageGenerator};
use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info, instrument};

pub const DEFAULT_BASE_URL: &str = "https://api.ideogram.ai";

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    image_request: ImageRequest<'a>,
}

#[derive(Debug, Serialize)]
struct ImageRequest<'a> {
    prompt: &'a str,
    aspect_ratio: &'static str,
    model: &'static str,
    style_type: &'static str,
    color_palette: ColorPalette,
}

#[derive(Debug, Serialize)]
struct ColorPalette {
    name: &'static str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    data: Vec<GeneratedImage>,
}

#[derive(Debug, Deserialize)]
struct GeneratedImage {
    url: Option<String>,
}

impl<'a> GenerateRequest<'a> {
    fn new(prompt: &'a str) -> Self {
        Self {
            image_request: ImageRequest {
                prompt,
                aspect_ratio: IMAGE_ASPECT_RATIO,
                model: IMAGE_MODEL,
                style_type: IMAGE_STYLE_TYPE,
                color_palette: ColorPalette {
                    name: IMAGE_COLOR_PALETTE,
                },
            },
        }
    }
}

pub struct IdeogramClient {
    http: Client,
    base_url: String,
    api_key: String,
}

impl std::fmt::Debug for IdeogramClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdeogramClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl IdeogramClient {
    pub fn new(http: Client, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    /// Ask for one image and return its URL.
    async fn generate_url(&self, prompt: &str) -> Result<String> {
        let response = self
            .http
            .post(format!("{}/generate", self.base_url))
            .header("Api-Key", &self.api_key)
            .json(&GenerateRequest::new(prompt))
            .send()
            .await?;
        let response = ensure_success(response, "image generation").await?;
        first_image_url(&response.text().await?)
    }

    async fn download(&self, url: &str) -> Result<Image> {
        let response = ensure_success(self.http.get(url).send().await?, "image download").await?;
        let mime = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("image/png")
            .to_string();
        let bytes = response.bytes().await?.to_vec();
        Ok(Image { bytes, mime })
    }
}

fn first_image_url(body: &str) -> Result<String> {
    let parsed: GenerateResponse = serde_json::from_str(body)
        .map_err(|e| RunError::Fetch(format!("malformed image generation reply: {e}")))?;
    parsed
        .data
        .into_iter()
        .find_map(|image| image.url)
        .ok_or_else(|| RunError::Fetch("image generation returned no image".to_string()))
}

#[async_trait]
impl ImageGenerator for IdeogramClient {
    #[instrument(level = "info", skip_all, fields(prompt_chars = prompt.chars().count()))]
    async fn generate(&self, prompt: &str) -> Result<Image> {
        let t0 = Instant::now();
        let url = self.generate_url(prompt).await?;
        debug!(%url, "Image generated");

        let image = self.download(&url).await?;
        info!(
            bytes = image.bytes.len(),
            mime = %image.mime,
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Downloaded generated image"
        );
        Ok(image)
    }
}
