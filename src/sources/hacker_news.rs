//! Hacker News via the public Firebase API.
//!
//! `topstories.json` returns up to 500 ids in front-page order;
//! `item/{id}.json` returns the story or `null` for deleted ids.

use super::RankedSource;
use crate::clients::ensure_success;
use crate::error::{Result, RunError};
use crate::models::{ItemDetails, ItemId};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Instant;
use tracing::{debug, info, instrument};

pub const DEFAULT_BASE_URL: &str = "https://hacker-news.firebaseio.com/v0";

#[derive(Debug, Clone)]
pub struct HackerNewsClient {
    http: Client,
    base_url: String,
}

impl HackerNewsClient {
    pub fn new(http: Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl RankedSource for HackerNewsClient {
    #[instrument(level = "info", skip_all)]
    async fn ranked_ids(&self) -> Result<Vec<ItemId>> {
        let t0 = Instant::now();
        let url = format!("{}/topstories.json", self.base_url);
        let response = ensure_success(self.http.get(&url).send().await?, "topstories").await?;
        let ids = parse_top_stories(&response.text().await?)?;

        info!(
            count = ids.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Fetched Hacker News ranking"
        );
        Ok(ids)
    }

    #[instrument(level = "info", skip_all, fields(%id))]
    async fn item(&self, id: &ItemId) -> Result<ItemDetails> {
        let url = format!("{}/item/{}.json", self.base_url, id);
        let response = ensure_success(self.http.get(&url).send().await?, "item").await?;
        let details = parse_item(id, &response.text().await?)?;

        debug!(title = ?details.title, url = ?details.url, "Fetched item details");
        Ok(details)
    }
}

fn parse_top_stories(body: &str) -> Result<Vec<ItemId>> {
    let ids: Vec<u64> = serde_json::from_str(body)
        .map_err(|e| RunError::Fetch(format!("malformed topstories body: {e}")))?;
    Ok(ids.into_iter().map(ItemId::from).collect())
}

fn parse_item(id: &ItemId, body: &str) -> Result<ItemDetails> {
    let item: Option<ItemDetails> = serde_json::from_str(body)
        .map_err(|e| RunError::Fetch(format!("malformed item {id} body: {e}")))?;
    item.ok_or_else(|| RunError::Fetch(format!("item {id} does not exist")))
}
