//! Deterministic stand-in LLM backend and demo tool, so the turn
//! orchestrator (`vox_llm`) has something real to drive end to end without a
//! bundled model.

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use vox_foundation::error::VoxError;
use vox_llm::{ChatDelta, LlmProvider, Tool, ToolCallDelta};

fn last_user_content(messages: &[Value]) -> String {
    messages
        .iter()
        .rev()
        .find(|m| m["role"] == "user")
        .and_then(|m| m["content"].as_str())
        .unwrap_or("")
        .to_string()
}

/// Echoes the user's last message back, unless it mentions weather and a
/// tool is available, in which case it asks for `get_weather` once.
pub struct EchoLlmProvider;

#[async_trait]
impl LlmProvider for EchoLlmProvider {
    fn supports_streaming(&self) -> bool {
        false
    }

    async fn chat(&self, messages: &[Value], tools: Option<&Value>) -> Result<ChatDelta, VoxError> {
        let last_user = last_user_content(messages);
        if tools.is_some() && last_user.to_lowercase().contains("weather") {
            return Ok(ChatDelta {
                reasoning: None,
                content: None,
                tool_calls: vec![ToolCallDelta {
                    id: format!("call-{}", uuid::Uuid::new_v4()),
                    name: "get_weather".into(),
                    args_json: json!({ "query": last_user }).to_string(),
                    index: 0,
                }],
            });
        }
        Ok(ChatDelta {
            content: Some(format!("You said: {last_user}")),
            ..Default::default()
        })
    }

    async fn chat_stream(&self, _messages: &[Value], _tools: Option<&Value>) -> Result<mpsc::Receiver<ChatDelta>, VoxError> {
        unreachable!("EchoLlmProvider does not support streaming")
    }

    async fn generate(&self, messages: &[Value]) -> Result<ChatDelta, VoxError> {
        let last_user = last_user_content(messages);
        Ok(ChatDelta {
            content: Some(format!("You said: {last_user}")),
            ..Default::default()
        })
    }

    async fn generate_stream(&self, _messages: &[Value]) -> Result<mpsc::Receiver<ChatDelta>, VoxError> {
        unreachable!("EchoLlmProvider does not support streaming")
    }
}

/// Demo tool exercising the tool-call loop (spec §4.7); returns a fixed
/// reading rather than calling a real weather service.
pub struct GetWeatherTool;

#[async_trait]
impl Tool for GetWeatherTool {
    fn name(&self) -> &str {
        "get_weather"
    }

    fn schema(&self) -> Value {
        json!({
            "name": "get_weather",
            "description": "Looks up the current weather for a place mentioned in the query.",
            "parameters": {
                "type": "object",
                "properties": { "query": { "type": "string" } },
                "required": ["query"],
            },
        })
    }

    async fn execute(&self, _args: Value) -> Result<String, VoxError> {
        Ok("72F and sunny".to_string())
    }
}
