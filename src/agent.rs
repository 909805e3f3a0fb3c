//! Tool-calling loop.
//!
//! The agent sends the background prompt, the task and the tool definitions
//! to the model, runs whatever tools it asks for, and feeds the results back
//! until the model answers in plain text or the step budget is spent.
//!
//! A tool that rejects its input ([`RunError::Validation`]) is reported back
//! to the model as an `Error: ...` tool result so it can correct itself. Any
//! other tool error ends the loop and is returned as is.

use crate::api::{ChatApi, ChatMessage, ChatRequest};
use crate::error::{Result, RunError};
use crate::tools::ToolRegistry;
use crate::utils::truncate_for_log;
use tracing::{debug, info, instrument, warn};

/// A tool call the tool refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub tool: String,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct AgentReport {
    /// The model's closing text, if it stopped on its own.
    pub final_text: Option<String>,
    /// Names of every tool call the model made, in order.
    pub tool_calls_made: Vec<String>,
    /// Model turns taken.
    pub steps: usize,
    pub rejections: Vec<Rejection>,
}

pub struct Agent<'a, C: ChatApi> {
    pub chat: &'a C,
    pub model: String,
    pub background: String,
    pub registry: &'a ToolRegistry,
    pub max_steps: usize,
}

impl<C: ChatApi> Agent<'_, C> {
    #[instrument(level = "info", skip_all, fields(model = %self.model, max_steps = self.max_steps))]
    pub async fn run(&self, task: &str) -> Result<AgentReport> {
        let mut messages = vec![
            ChatMessage::system(self.background.clone()),
            ChatMessage::user(task),
        ];
        let tools = self.registry.definitions();
        let mut report = AgentReport::default();

        while report.steps < self.max_steps {
            report.steps += 1;
            info!(
                step = report.steps,
                message_count = messages.len(),
                tool_count = tools.len(),
                "Agent step starting"
            );

            let request = ChatRequest {
                model: self.model.clone(),
                messages: messages.clone(),
                tool_choice: (!tools.is_empty()).then(|| "auto".to_string()),
                tools: tools.clone(),
            };
            let reply = self.chat.complete(&request).await?;

            if reply.tool_calls.is_empty() {
                info!(
                    steps = report.steps,
                    tool_calls_total = report.tool_calls_made.len(),
                    "Agent finished with a final answer"
                );
                debug!(content = ?reply.content, "Agent final answer");
                report.final_text = reply.content;
                return Ok(report);
            }

            let calls = reply.tool_calls.clone();
            messages.push(reply);

            for call in calls {
                let name = call.function.name;
                info!(tool = %name, id = %call.id, arguments = %truncate_for_log(&call.function.arguments, 200), "Executing tool call");
                report.tool_calls_made.push(name.clone());

                let content = match self.registry.dispatch(&name, &call.function.arguments).await {
                    Ok(output) => {
                        info!(
                            tool = %name,
                            result_len = output.len(),
                            result_preview = %truncate_for_log(&output, 200),
                            "Tool call complete"
                        );
                        output
                    }
                    Err(RunError::Validation(message)) => {
                        warn!(tool = %name, error = %message, "Tool rejected its input");
                        let content = format!("Error: {message}");
                        report.rejections.push(Rejection {
                            tool: name,
                            message,
                        });
                        content
                    }
                    Err(e) => {
                        warn!(tool = %name, error = %e, "Tool call failed; stopping");
                        return Err(e);
                    }
                };
                messages.push(ChatMessage::tool(call.id, content));
            }
        }

        warn!(max_steps = self.max_steps, "Agent reached its step budget");
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::{ScriptedChat, tool_calls as calls};
    use crate::tools::Tool;
    use async_trait::async_trait;
    use schemars::JsonSchema;
    use serde::{Deserialize, Serialize};

    #[derive(Deserialize, JsonSchema)]
    struct ShoutArgs {
        text: String,
    }

    #[derive(Serialize)]
    struct ShoutOutput {
        shouted: String,
    }

    /// Upper-cases text; rejects empty text and fails hard on "boom".
    struct ShoutTool;

    #[async_trait]
    impl Tool for ShoutTool {
        const NAME: &'static str = "shout";
        type Args = ShoutArgs;
        type Output = ShoutOutput;

        fn description(&self) -> &str {
            "Upper-case the text"
        }

        async fn call(&self, args: ShoutArgs) -> Result<ShoutOutput> {
            match args.text.as_str() {
                "" => Err(RunError::Validation("text must not be empty".to_string())),
                "boom" => Err(RunError::Fetch("upstream down".to_string())),
                text => Ok(ShoutOutput {
                    shouted: text.to_uppercase(),
                }),
            }
        }
    }

    fn agent<'a>(chat: &'a ScriptedChat, registry: &'a ToolRegistry, max_steps: usize) -> Agent<'a, ScriptedChat> {
        Agent {
            chat,
            model: "gpt-4o-mini".to_string(),
            background: "You shout.".to_string(),
            registry,
            max_steps,
        }
    }

    #[tokio::test]
    async fn test_runs_tool_then_returns_final_text() {
        let chat = ScriptedChat::new(vec![
            calls(&[("c1", "shout", r#"{"text":"hi"}"#)]),
            ChatMessage::assistant("Done."),
        ]);
        let registry = ToolRegistry::new().with(ShoutTool);

        let report = agent(&chat, &registry, 3).run("Shout hi").await.unwrap();
        assert_eq!(report.final_text.as_deref(), Some("Done."));
        assert_eq!(report.tool_calls_made, vec!["shout"]);
        assert_eq!(report.steps, 2);
        assert!(report.rejections.is_empty());

        let requests = chat.requests.lock().unwrap();
        assert_eq!(requests[0].messages[0].role, "system");
        assert_eq!(requests[0].messages[1].content.as_deref(), Some("Shout hi"));
        assert_eq!(requests[0].tools.len(), 1);
        assert_eq!(requests[0].tool_choice.as_deref(), Some("auto"));

        let tool_reply = requests[1].messages.last().unwrap();
        assert_eq!(tool_reply.role, "tool");
        assert_eq!(tool_reply.tool_call_id.as_deref(), Some("c1"));
        assert_eq!(tool_reply.content.as_deref(), Some(r#"{"shouted":"HI"}"#));
    }

    #[tokio::test]
    async fn test_validation_error_is_fed_back_to_model() {
        let chat = ScriptedChat::new(vec![
            calls(&[("c1", "shout", r#"{"text":""}"#)]),
            calls(&[("c2", "shout", r#"{"text":"ok"}"#)]),
            ChatMessage::assistant("Fixed it."),
        ]);
        let registry = ToolRegistry::new().with(ShoutTool);

        let report = agent(&chat, &registry, 3).run("go").await.unwrap();
        assert_eq!(report.steps, 3);
        assert_eq!(report.tool_calls_made, vec!["shout", "shout"]);
        assert_eq!(
            report.rejections,
            vec![Rejection {
                tool: "shout".to_string(),
                message: "text must not be empty".to_string(),
            }]
        );

        let requests = chat.requests.lock().unwrap();
        let fed_back = requests[1].messages.last().unwrap();
        assert_eq!(fed_back.content.as_deref(), Some("Error: text must not be empty"));
    }

    #[tokio::test]
    async fn test_unknown_tool_is_reported_not_fatal() {
        let chat = ScriptedChat::new(vec![
            calls(&[("c1", "whisper", "{}")]),
            ChatMessage::assistant("Sorry."),
        ]);
        let registry = ToolRegistry::new().with(ShoutTool);

        let report = agent(&chat, &registry, 3).run("go").await.unwrap();
        assert_eq!(report.rejections.len(), 1);
        assert!(report.rejections[0].message.contains("whisper"));
    }

    #[tokio::test]
    async fn test_other_tool_errors_abort() {
        let chat = ScriptedChat::new(vec![
            calls(&[("c1", "shout", r#"{"text":"boom"}"#)]),
            ChatMessage::assistant("unreachable"),
        ]);
        let registry = ToolRegistry::new().with(ShoutTool);

        let err = agent(&chat, &registry, 3).run("go").await.unwrap_err();
        assert!(matches!(err, RunError::Fetch(ref m) if m == "upstream down"));
        assert_eq!(chat.requests.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_step_budget_still_runs_last_step_tools() {
        let chat = ScriptedChat::new(vec![
            calls(&[("c1", "shout", r#"{"text":"a"}"#)]),
            calls(&[("c2", "shout", r#"{"text":"b"}"#), ("c3", "shout", r#"{"text":"c"}"#)]),
            ChatMessage::assistant("never asked"),
        ]);
        let registry = ToolRegistry::new().with(ShoutTool);

        let report = agent(&chat, &registry, 2).run("go").await.unwrap();
        assert_eq!(report.steps, 2);
        assert_eq!(report.final_text, None);
        assert_eq!(report.tool_calls_made.len(), 3);
        assert_eq!(chat.requests.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_chat_failure_propagates() {
        let chat = ScriptedChat::new(Vec::new());
        let registry = ToolRegistry::new();
        let err = agent(&chat, &registry, 3).run("go").await.unwrap_err();
        assert!(matches!(err, RunError::Fetch(_)));
    }
}
