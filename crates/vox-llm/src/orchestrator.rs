use std::sync::Arc;

use serde_json::{json, Value};
use vox_chat::Session;
use vox_foundation::error::{LlmError, VoxError};
use vox_telemetry::PipelineMetrics;

use crate::provider::{ChatDelta, LlmProvider};
use crate::tool::ToolRegistry;

/// Tool-call loop cap (spec §4.7): after this many rounds of tool calls,
/// the orchestrator stops looping even if the model keeps asking for more.
pub const MAX_TOOL_ROUNDS: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatMode {
    /// Tool-enabled conversational mode.
    Chat,
    /// Tool-free single-shot completion.
    Generate,
}

/// What the orchestrator hands back per delta so the caller (a pipeline
/// processor, typically) can turn it into outbound frames without the
/// orchestrator depending on the frame/pipeline crates itself.
pub enum TurnEvent {
    Think(String),
    Content(String),
    FunctionCall {
        tool_call_id: String,
        name: String,
        args: Value,
        index: u32,
    },
    TurnEnd,
}

/// Drives one user turn through the tool-call loop (spec §4.7), emitting
/// [`TurnEvent`]s via `on_event` as they're produced and persisting the
/// final exchange to `session`'s chat history.
pub struct TurnOrchestrator {
    provider: Arc<dyn LlmProvider>,
    tools: ToolRegistry,
    streaming: bool,
    persist_reasoning: bool,
    metrics: Option<PipelineMetrics>,
}

impl TurnOrchestrator {
    pub fn new(provider: Arc<dyn LlmProvider>, tools: ToolRegistry, streaming: bool, persist_reasoning: bool) -> Self {
        Self {
            provider,
            tools,
            streaming,
            persist_reasoning,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: PipelineMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub async fn run_turn<F>(
        &self,
        session: &mut Session,
        user_text: String,
        mode: ChatMode,
        mut on_event: F,
    ) -> Result<(), VoxError>
    where
        F: FnMut(TurnEvent),
    {
        session
            .chat_history_mut()
            .append(json!({"role": "user", "content": user_text}));

        let tools_schema = if mode == ChatMode::Chat && !self.tools.is_empty() {
            Some(self.tools.schema())
        } else {
            None
        };

        let mut round: u32 = 0;
        loop {
            let messages = session.chat_history().to_list_without_tools();
            let mut accum = TurnAccumulator::default();

            if self.streaming && self.provider.supports_streaming() {
                let mut rx = match mode {
                    ChatMode::Chat => self.provider.chat_stream(&messages, tools_schema.as_ref()).await?,
                    ChatMode::Generate => self.provider.generate_stream(&messages).await?,
                };
                while let Some(delta) = rx.recv().await {
                    self.apply_delta(delta, &mut accum, &mut on_event).await;
                }
            } else {
                let delta = match mode {
                    ChatMode::Chat => self.provider.chat(&messages, tools_schema.as_ref()).await?,
                    ChatMode::Generate => self.provider.generate(&messages).await?,
                };
                self.apply_delta(delta, &mut accum, &mut on_event).await;
            }

            if let Some(metrics) = &self.metrics {
                metrics.record_llm_call();
            }

            if accum.had_tool_calls {
                let mut assistant_msg = json!({
                    "role": "assistant",
                    "content": accum.content,
                    "tool_calls": accum.tool_call_descriptors,
                });
                if self.persist_reasoning && !accum.reasoning.is_empty() {
                    assistant_msg["reasoning"] = json!(accum.reasoning);
                }
                session.chat_history_mut().append(assistant_msg);
                for tool_message in accum.tool_messages {
                    session.chat_history_mut().append(tool_message);
                }

                round += 1;
                if let Some(metrics) = &self.metrics {
                    metrics.record_tool_round();
                }
                if round >= MAX_TOOL_ROUNDS {
                    tracing::warn!(round, "tool-call loop hit MAX_TOOL_ROUNDS, ending turn");
                    break;
                }
                continue;
            }

            let mut assistant_msg = json!({"role": "assistant", "content": accum.content});
            if self.persist_reasoning && !accum.reasoning.is_empty() {
                assistant_msg["reasoning"] = json!(accum.reasoning);
            }
            session.chat_history_mut().append(assistant_msg);
            break;
        }

        on_event(TurnEvent::TurnEnd);
        session.increment_chat_round();
        if let Some(metrics) = &self.metrics {
            metrics.record_turn_completed();
        }
        Ok(())
    }

    async fn apply_delta<F>(&self, delta: ChatDelta, accum: &mut TurnAccumulator, on_event: &mut F)
    where
        F: FnMut(TurnEvent),
    {
        if let Some(reasoning) = delta.reasoning {
            if !reasoning.is_empty() {
                accum.reasoning.push_str(&reasoning);
                on_event(TurnEvent::Think(reasoning));
            }
        }
        if let Some(content) = delta.content {
            if !content.is_empty() {
                accum.content.push_str(&content);
                on_event(TurnEvent::Content(content));
            }
        }
        for call in delta.tool_calls {
            let args: Value = match serde_json::from_str(&call.args_json) {
                Ok(v) => v,
                Err(source) => {
                    tracing::warn!(tool = call.name.as_str(), %source, "tool call arguments failed to decode, skipping");
                    let _ = VoxError::from(LlmError::ToolArgsInvalid {
                        name: call.name.clone(),
                        source,
                    });
                    continue;
                }
            };
            let Some(tool) = self.tools.get(&call.name) else {
                tracing::warn!(tool = call.name.as_str(), "tool not registered, skipping");
                continue;
            };

            accum.had_tool_calls = true;
            accum.tool_call_descriptors.push(json!({
                "id": call.id,
                "name": call.name,
                "arguments": args,
                "index": call.index,
            }));

            let result = match tool.execute(args.clone()).await {
                Ok(result) => result,
                Err(err) => {
                    tracing::warn!(tool = call.name.as_str(), error = %err, "tool execution failed, skipping result");
                    format!("error: {err}")
                }
            };
            accum.tool_messages.push(json!({
                "role": "tool",
                "tool_call_id": call.id,
                "name": call.name,
                "content": result,
            }));

            on_event(TurnEvent::FunctionCall {
                tool_call_id: call.id,
                name: call.name,
                args,
                index: call.index,
            });
        }
    }
}

#[derive(Default)]
struct TurnAccumulator {
    reasoning: String,
    content: String,
    had_tool_calls: bool,
    tool_call_descriptors: Vec<Value>,
    tool_messages: Vec<Value>,
}
