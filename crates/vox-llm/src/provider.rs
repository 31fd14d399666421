use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;
use vox_foundation::error::VoxError;

/// One chunk of a model response (spec §4.7). A non-streaming call yields
/// exactly one `ChatDelta` carrying the whole response; a streaming call
/// yields a sequence of smaller ones over the returned channel.
#[derive(Debug, Clone, Default)]
pub struct ChatDelta {
    pub reasoning: Option<String>,
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCallDelta>,
}

#[derive(Debug, Clone)]
pub struct ToolCallDelta {
    pub id: String,
    pub name: String,
    pub args_json: String,
    pub index: u32,
}

/// A large-language-model backend (spec §6). `chat` carries tool schemas
/// and participates in the tool-call loop; `generate` is the tool-free
/// single-shot mode.
///
/// The reference interface expresses streaming as a push callback; here it
/// is a channel the orchestrator drains, which composes with `async`/`await`
/// without a callback needing to cross suspension points.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    fn supports_streaming(&self) -> bool {
        true
    }

    async fn chat(&self, messages: &[Value], tools: Option<&Value>) -> Result<ChatDelta, VoxError>;

    async fn chat_stream(
        &self,
        messages: &[Value],
        tools: Option<&Value>,
    ) -> Result<mpsc::Receiver<ChatDelta>, VoxError>;

    async fn generate(&self, messages: &[Value]) -> Result<ChatDelta, VoxError>;

    async fn generate_stream(&self, messages: &[Value]) -> Result<mpsc::Receiver<ChatDelta>, VoxError>;
}
