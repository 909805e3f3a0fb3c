//! Visited set stored in an Upstash Redis set, spoken to over its REST API.
//!
//! A command is a JSON array POSTed to the database URL with a bearer token;
//! the reply is `{"result": ...}` or `{"error": "..."}`.

use super::ensure_success;
use crate::error::{Result, RunError};
use crate::models::ItemId;
use crate::visited::VisitedSet;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::time::Instant;
use tracing::{debug, info, instrument};

#[derive(Debug, Deserialize)]
struct Reply<T> {
    result: Option<T>,
    error: Option<String>,
}

pub struct UpstashVisitedSet {
    http: Client,
    url: String,
    token: String,
    key: String,
}

impl std::fmt::Debug for UpstashVisitedSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstashVisitedSet")
            .field("url", &self.url)
            .field("key", &self.key)
            .finish()
    }
}

impl UpstashVisitedSet {
    pub fn new(
        http: Client,
        url: impl Into<String>,
        token: impl Into<String>,
        key: impl Into<String>,
    ) -> Self {
        Self {
            http,
            url: url.into(),
            token: token.into(),
            key: key.into(),
        }
    }

    async fn command<T: DeserializeOwned>(&self, name: &str, command: Value) -> Result<T> {
        let response = self
            .http
            .post(&self.url)
            .bearer_auth(&self.token)
            .json(&command)
            .send()
            .await?;
        let response = ensure_success(response, name).await?;
        parse_reply(name, &response.text().await?)
    }
}

fn smismember_command(key: &str, ids: &[ItemId]) -> Value {
    let mut command = vec![json!("SMISMEMBER"), json!(key)];
    command.extend(ids.iter().map(|id| json!(id.as_str())));
    Value::Array(command)
}

fn parse_reply<T: DeserializeOwned>(name: &str, body: &str) -> Result<T> {
    let reply: Reply<T> = serde_json::from_str(body)
        .map_err(|e| RunError::Fetch(format!("malformed {name} reply: {e}")))?;
    if let Some(error) = reply.error {
        return Err(RunError::Fetch(format!("{name} failed: {error}")));
    }
    reply
        .result
        .ok_or_else(|| RunError::Fetch(format!("{name} reply has no result")))
}

#[async_trait]
impl VisitedSet for UpstashVisitedSet {
    #[instrument(level = "info", skip_all, fields(ids = ids.len()))]
    async fn contains_many(&self, ids: &[ItemId]) -> Result<Vec<bool>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let t0 = Instant::now();
        let flags: Vec<i64> = self
            .command("SMISMEMBER", smismember_command(&self.key, ids))
            .await?;
        let flags: Vec<bool> = flags.into_iter().map(|f| f != 0).collect();

        info!(
            key = %self.key,
            visited = flags.iter().filter(|f| **f).count(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Checked visited set"
        );
        Ok(flags)
    }

    #[instrument(level = "info", skip_all, fields(%id))]
    async fn add(&self, id: &ItemId) -> Result<()> {
        let added: i64 = self
            .command("SADD", json!(["SADD", self.key, id.as_str()]))
            .await?;
        debug!(key = %self.key, added, "Marked item visited");
        Ok(())
    }
}
