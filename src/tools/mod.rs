//! Capabilities the model may call, keyed by name.
//!
//! Each tool declares a typed argument struct. Arguments arrive as the raw
//! JSON string the model produced and are deserialized into that struct
//! before the handler runs, so a handler never sees malformed input; a
//! mismatch is a [`RunError::Validation`] reported back to the model.
//!
//! | Tool | Module | Effect |
//! |------|--------|--------|
//! | `top_unvisited_story` | [`story`] | select, mark visited, extract |
//! | `post_tweet` | [`tweet`] | publish text |
//! | `post_tweet_with_image` | [`tweet`] | generate image, publish text + image |

pub mod story;
pub mod tweet;

use crate::error::{Result, RunError};
use crate::models::{ExtractedContent, ItemId};
use async_trait::async_trait;
use schemars::{JsonSchema, schema_for};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};
use tracing::debug;

/// A capability with typed arguments and output.
#[async_trait]
pub trait Tool: Send + Sync {
    const NAME: &'static str;

    type Args: DeserializeOwned + JsonSchema + Send;

    type Output: Serialize + Send;

    fn description(&self) -> &str;

    async fn call(&self, args: Self::Args) -> Result<Self::Output>;
}

/// Object-safe view of a [`Tool`], so differently typed tools share a registry.
#[async_trait]
pub trait ErasedTool: Send + Sync {
    fn name(&self) -> &str;

    /// Definition in OpenAI `tools` format.
    fn definition(&self) -> Value;

    /// Parse `arguments`, run the tool, return its JSON output.
    async fn call_erased(&self, arguments: &str) -> Result<String>;
}

#[async_trait]
impl<T: Tool> ErasedTool for T {
    fn name(&self) -> &str {
        T::NAME
    }

    fn definition(&self) -> Value {
        json!({
            "type": "function",
            "function": {
                "name": T::NAME,
                "description": self.description(),
                "parameters": parameters_schema::<T::Args>(),
            }
        })
    }

    async fn call_erased(&self, arguments: &str) -> Result<String> {
        // Models sometimes send "" for a tool without parameters.
        let arguments = if arguments.trim().is_empty() { "{}" } else { arguments };
        let args: T::Args = serde_json::from_str(arguments).map_err(|e| {
            RunError::Validation(format!("invalid arguments for {}: {e}", T::NAME))
        })?;

        let output = self.call(args).await?;
        serde_json::to_string(&output)
            .map_err(|e| RunError::Validation(format!("unserializable {} output: {e}", T::NAME)))
    }
}

/// JSON Schema for a tool's arguments, trimmed to what the API expects.
fn parameters_schema<A: JsonSchema>() -> Value {
    let mut schema = serde_json::to_value(schema_for!(A)).unwrap_or_else(|_| json!({}));
    if let Value::Object(map) = &mut schema {
        map.remove("$schema");
        map.remove("title");
        map.remove("definitions");
        map.insert("type".to_string(), json!("object"));
        map.entry("properties").or_insert_with(|| json!({}));
        map.insert("additionalProperties".to_string(), json!(false));
    }
    schema
}

/// Tools by name, in registration order.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Box<dyn ErasedTool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `tool`, replacing any tool already registered under its name.
    pub fn with<T: Tool + 'static>(mut self, tool: T) -> Self {
        self.tools.retain(|t| t.name() != T::NAME);
        self.tools.push(Box::new(tool));
        self
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn definitions(&self) -> Vec<Value> {
        self.tools.iter().map(|t| t.definition()).collect()
    }

    /// Run the tool called `name` with raw JSON `arguments`.
    ///
    /// # Errors
    ///
    /// [`RunError::Validation`] for an unknown name or bad arguments; any
    /// other error is the tool's own and is returned unchanged.
    pub async fn dispatch(&self, name: &str, arguments: &str) -> Result<String> {
        let Some(tool) = self.tools.iter().find(|t| t.name() == name) else {
            return Err(RunError::Validation(format!("unknown tool '{name}'")));
        };
        debug!(tool = name, "Dispatching tool call");
        tool.call_erased(arguments).await
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}

/// What the tools did during one run, read back by the run after the agent
/// loop ends.
#[derive(Debug, Default)]
pub struct Session {
    /// The story handed to the model. Set once per run.
    pub story: Option<(ItemId, ExtractedContent)>,
    /// The post that was published. Set once per run.
    pub post: Option<PostOutcome>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostOutcome {
    pub tweet: String,
    pub tweet_id: Option<String>,
    pub with_image: bool,
}

pub type SharedSession = Arc<Mutex<Session>>;

/// Lock the session, recovering the data if a panicking holder poisoned it.
pub(crate) fn lock(session: &SharedSession) -> std::sync::MutexGuard<'_, Session> {
    session.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize, JsonSchema)]
    struct EchoArgs {
        /// Text to echo back.
        message: String,
    }

    #[derive(Serialize)]
    struct EchoOutput {
        echoed: String,
    }

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        const NAME: &'static str = "echo";
        type Args = EchoArgs;
        type Output = EchoOutput;

        fn description(&self) -> &str {
            "Echo back the input message"
        }

        async fn call(&self, args: Self::Args) -> Result<Self::Output> {
            Ok(EchoOutput {
                echoed: args.message,
            })
        }
    }

    #[derive(Deserialize, JsonSchema)]
    struct NoArgs {}

    struct FailingTool;

    #[async_trait]
    impl Tool for FailingTool {
        const NAME: &'static str = "fail";
        type Args = NoArgs;
        type Output = ();

        fn description(&self) -> &str {
            "Always fails"
        }

        async fn call(&self, _args: Self::Args) -> Result<Self::Output> {
            Err(RunError::Fetch("upstream down".to_string()))
        }
    }

    #[test]
    fn test_definition_format() {
        let def = ErasedTool::definition(&EchoTool);
        assert_eq!(def["type"], "function");
        assert_eq!(def["function"]["name"], "echo");
        assert_eq!(def["function"]["description"], "Echo back the input message");

        let params = &def["function"]["parameters"];
        assert_eq!(params["type"], "object");
        assert_eq!(params["additionalProperties"], false);
        assert_eq!(params["properties"]["message"]["type"], "string");
        assert_eq!(params["required"][0], "message");
        assert!(params.get("$schema").is_none());
    }

    #[test]
    fn test_no_args_schema_is_empty_object() {
        let params = parameters_schema::<NoArgs>();
        assert_eq!(params["type"], "object");
        assert_eq!(params["properties"], json!({}));
    }

    #[tokio::test]
    async fn test_dispatch_runs_tool() {
        let registry = ToolRegistry::new().with(EchoTool);
        let out = registry.dispatch("echo", r#"{"message":"hi"}"#).await.unwrap();
        let out: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(out["echoed"], "hi");
    }

    #[tokio::test]
    async fn test_dispatch_unknown_tool_is_validation_error() {
        let registry = ToolRegistry::new().with(EchoTool);
        let err = registry.dispatch("nope", "{}").await.unwrap_err();
        assert!(matches!(err, RunError::Validation(ref m) if m.contains("nope")));
    }

    #[tokio::test]
    async fn test_dispatch_bad_arguments_is_validation_error() {
        let registry = ToolRegistry::new().with(EchoTool);
        let err = registry.dispatch("echo", r#"{"msg":1}"#).await.unwrap_err();
        assert!(matches!(err, RunError::Validation(_)));

        let err = registry.dispatch("echo", r#""hi""#).await.unwrap_err();
        assert!(matches!(err, RunError::Validation(_)));
    }

    #[tokio::test]
    async fn test_empty_arguments_accepted_for_parameterless_tool() {
        let registry = ToolRegistry::new().with(FailingTool);
        let err = registry.dispatch("fail", "").await.unwrap_err();
        // Reached the handler, so the empty string was accepted as `{}`.
        assert!(matches!(err, RunError::Fetch(_)));
    }

    #[tokio::test]
    async fn test_tool_errors_pass_through_unchanged() {
        let registry = ToolRegistry::new().with(FailingTool);
        let err = registry.dispatch("fail", "{}").await.unwrap_err();
        assert!(matches!(err, RunError::Fetch(ref m) if m == "upstream down"));
    }

    #[test]
    fn test_registration_replaces_same_name() {
        let registry = ToolRegistry::new().with(EchoTool).with(FailingTool).with(EchoTool);
        assert_eq!(registry.names(), vec!["fail", "echo"]);
        assert_eq!(registry.definitions().len(), 2);
    }
}
