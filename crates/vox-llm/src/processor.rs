use async_trait::async_trait;
use vox_chat::Session;
use vox_frames::{ControlFrame, DataFrame, Frame, FrameEnvelope, FunctionCall, Text, ThinkText};
use vox_pipeline::{Direction, Processor, ProcessorContext};

use crate::orchestrator::{ChatMode, TurnEvent, TurnOrchestrator};

/// Wraps [`TurnOrchestrator`] as a pipeline stage: each incoming `Text`
/// frame becomes one user turn; the orchestrator's events become outbound
/// frames (spec §4.7).
pub struct LlmProcessor {
    orchestrator: TurnOrchestrator,
    session: Session,
    mode: ChatMode,
}

impl LlmProcessor {
    pub fn new(orchestrator: TurnOrchestrator, session: Session, mode: ChatMode) -> Self {
        Self {
            orchestrator,
            session,
            mode,
        }
    }
}

#[async_trait]
impl Processor for LlmProcessor {
    fn name(&self) -> &str {
        "llm-turn-orchestrator"
    }

    async fn process_frame(&mut self, frame: FrameEnvelope, direction: Direction, ctx: &ProcessorContext) {
        let text = match &frame.payload {
            Frame::Data(DataFrame::Text(t)) => Some(t.utf8.clone()),
            Frame::Control(ControlFrame::Cancel) | Frame::Control(ControlFrame::End) => {
                ctx.queue_frame(frame, direction).await;
                return;
            }
            _ => {
                ctx.queue_frame(frame, direction).await;
                return;
            }
        };
        let Some(text) = text else { return };

        // Collect events first: `on_event` must stay synchronous (no
        // `.await` inside a borrowed closure capturing `ctx`), so the
        // orchestrator hands back a plain Vec we then forward.
        let mut events = Vec::new();
        let result = self
            .orchestrator
            .run_turn(&mut self.session, text, self.mode, |event| events.push(event))
            .await;

        if let Err(err) = result {
            tracing::warn!(error = %err, "llm turn failed, emitting no downstream content for this input");
            return;
        }

        for event in events {
            match event {
                TurnEvent::Think(text) => {
                    ctx.queue_frame(FrameEnvelope::new(Frame::Data(DataFrame::ThinkText(ThinkText { text }))), direction)
                        .await;
                }
                TurnEvent::Content(text) => {
                    ctx.queue_frame(FrameEnvelope::new(Frame::Data(DataFrame::Text(Text { utf8: text }))), direction)
                        .await;
                }
                TurnEvent::FunctionCall {
                    tool_call_id,
                    name,
                    args,
                    index,
                } => {
                    ctx.queue_frame(
                        FrameEnvelope::new(Frame::Data(DataFrame::FunctionCall(FunctionCall {
                            tool_call_id,
                            name,
                            args,
                            index,
                        }))),
                        direction,
                    )
                    .await;
                }
                TurnEvent::TurnEnd => {
                    ctx.queue_frame(FrameEnvelope::new(Frame::Control(ControlFrame::TurnEnd)), direction)
                        .await;
                }
            }
        }
    }
}
