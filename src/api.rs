//! Chat-completions API with tool calling.
//!
//! # Architecture
//!
//! - [`ChatApi`]: one round trip to the model, the seam the agent loop is
//!   generic over
//! - [`OpenAiChat`]: the OpenAI-compatible HTTP implementation
//! - [`ChatMessage`] / [`ToolCall`]: the wire format, shared with the agent
//!
//! There is no retry here. A failed call fails the run and the scheduler
//! decides whether to try again.

use crate::clients::ensure_success;
use crate::error::{Result, RunError};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Instant;
use tracing::{info, instrument, warn};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// A chat message in OpenAI wire format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self::plain("system", content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::plain("user", content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::plain("assistant", content)
    }

    /// Result of one tool call, answered back to the model.
    pub fn tool(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            tool_call_id: Some(call_id.into()),
            ..Self::plain("tool", content)
        }
    }

    fn plain(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: Some(content.into()),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }
}

/// A tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    #[serde(rename = "type", default = "function_type")]
    pub kind: String,
    pub function: FunctionCall,
}

fn function_type() -> String {
    "function".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    /// JSON-encoded arguments, exactly as the model produced them.
    pub arguments: String,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: function_type(),
            function: FunctionCall {
                name: name.into(),
                arguments: arguments.into(),
            },
        }
    }
}

/// Request body for `/chat/completions`.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChatMessage,
}

/// One model round trip.
#[async_trait]
pub trait ChatApi: Send + Sync {
    /// Send the conversation and return the assistant's reply message.
    async fn complete(&self, request: &ChatRequest) -> Result<ChatMessage>;
}

/// OpenAI-compatible chat completions over HTTP.
pub struct OpenAiChat {
    http: Client,
    base_url: String,
    api_key: String,
}

impl std::fmt::Debug for OpenAiChat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiChat")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl OpenAiChat {
    pub fn new(http: Client, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl ChatApi for OpenAiChat {
    #[instrument(level = "info", skip_all, fields(model = %request.model, messages = request.messages.len()))]
    async fn complete(&self, request: &ChatRequest) -> Result<ChatMessage> {
        let t0 = Instant::now();
        let res = async {
            let response = self
                .http
                .post(format!("{}/chat/completions", self.base_url))
                .bearer_auth(&self.api_key)
                .json(request)
                .send()
                .await?;
            let response = ensure_success(response, "chat completion").await?;
            first_message(&response.text().await?)
        }
        .await;
        let dt = t0.elapsed();

        match &res {
            Ok(message) => info!(
                elapsed_ms = dt.as_millis() as u64,
                tool_calls = message.tool_calls.len(),
                "Chat completion succeeded"
            ),
            Err(e) => warn!(elapsed_ms = dt.as_millis() as u64, error = %e, "Chat completion failed"),
        }
        res
    }
}

fn first_message(body: &str) -> Result<ChatMessage> {
    let parsed: ChatResponse = serde_json::from_str(body)
        .map_err(|e| RunError::Fetch(format!("malformed chat completion reply: {e}")))?;
    parsed
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message)
        .ok_or_else(|| RunError::Fetch("chat completion returned no choices".to_string()))
}
