use async_trait::async_trait;
use vox_frames::FrameEnvelope;

use crate::context::ProcessorContext;
use crate::direction::Direction;

/// A pipeline stage's business logic (spec §4.2). Implementors never see
/// their neighbors directly — they call `ctx.push_frame`/`ctx.queue_frame`
/// and the runtime wrapper (sync or async, chosen by the pipeline composer)
/// takes care of wiring, backpressure, and lifecycle.
#[async_trait]
pub trait Processor: Send + 'static {
    fn name(&self) -> &str;

    /// One-time setup on first `Start` (spec §4.2 Start initialization
    /// contract). The default does nothing.
    async fn on_start(&mut self, _ctx: &ProcessorContext) {}

    /// Handle one frame arriving from either neighbor.
    async fn process_frame(&mut self, frame: FrameEnvelope, direction: Direction, ctx: &ProcessorContext);

    /// Graceful drain hook invoked when `End` is observed. The default
    /// forwards nothing extra; override to flush pending state (the
    /// aggregator and output stage both do).
    async fn on_end(&mut self, _ctx: &ProcessorContext) {}

    /// Immediate, non-draining teardown hook invoked on `Cancel`.
    async fn on_cancel(&mut self) {}
}
