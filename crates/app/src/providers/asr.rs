//! ASR adapter: the external speech-to-text model wrapper's interface and a
//! pipeline stage driving it against the response-aggregator's merged
//! utterance frame.

use std::sync::Arc;

use async_trait::async_trait;
use vox_foundation::error::VoxError;
use vox_frames::{DataFrame, Frame, FrameEnvelope, Text};
use vox_pipeline::{Direction, Processor, ProcessorContext};
use vox_pool::{Pool, PoolInstance};

/// The external ASR backend's interface. The concrete model is out of
/// scope here; this crate only needs something that satisfies the shape.
#[async_trait]
pub trait AsrProvider: Send {
    async fn transcribe(&mut self, audio_bytes: &[u8], sample_rate: u32) -> Result<String, VoxError>;

    async fn warmup(&mut self) -> Result<(), VoxError> {
        Ok(())
    }

    fn reset(&mut self) -> Result<(), VoxError> {
        Ok(())
    }

    fn release(self: Box<Self>) -> Result<(), VoxError> {
        Ok(())
    }
}

/// Wraps a boxed [`AsrProvider`] so it can live in a [`Pool`] (which is
/// generic over `T: PoolInstance`, never `dyn`).
pub struct PooledAsr(pub Box<dyn AsrProvider>);

impl PoolInstance for PooledAsr {
    fn reset(&mut self) -> Result<(), VoxError> {
        self.0.reset()
    }

    fn release(self) -> Result<(), VoxError> {
        self.0.release()
    }
}

/// Deterministic stand-in backend: reports the duration of silence-free
/// audio it was handed rather than running a real model. Keeps the pipeline
/// exercisable end to end without a bundled speech model.
#[derive(Default)]
pub struct MockAsrProvider;

#[async_trait]
impl AsrProvider for MockAsrProvider {
    async fn transcribe(&mut self, audio_bytes: &[u8], sample_rate: u32) -> Result<String, VoxError> {
        let sample_frames = audio_bytes.len() / 2; // 16-bit mono assumption matches the server's PCM convention
        let seconds = sample_frames as f64 / sample_rate.max(1) as f64;
        Ok(format!("[{seconds:.2}s of audio]"))
    }
}

/// Pipeline stage (spec §2 "ASR adapter"): turns the aggregated
/// `VadStateAudio` utterance into a `Text` frame by borrowing a provider
/// instance from the pool for the call's duration.
pub struct AsrProcessor {
    pool: Arc<Pool<PooledAsr>>,
}

impl AsrProcessor {
    pub fn new(pool: Arc<Pool<PooledAsr>>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Processor for AsrProcessor {
    fn name(&self) -> &str {
        "asr-adapter"
    }

    async fn process_frame(&mut self, frame: FrameEnvelope, direction: Direction, ctx: &ProcessorContext) {
        let audio = match &frame.payload {
            Frame::Data(DataFrame::VadStateAudio(v)) => Some((v.audio.bytes.clone(), v.audio.sample_rate)),
            _ => None,
        };

        let Some((bytes, sample_rate)) = audio else {
            ctx.queue_frame(frame, direction).await;
            return;
        };
        if bytes.is_empty() {
            return;
        }

        let mut instance = match self.pool.get().await {
            Ok(instance) => instance,
            Err(err) => {
                tracing::warn!(error = %err, "asr pool get failed, dropping utterance");
                return;
            }
        };

        let transcript = instance.0.transcribe(&bytes, sample_rate).await;
        self.pool.put(instance).await;

        match transcript {
            Ok(text) if !text.is_empty() => {
                ctx.queue_frame(FrameEnvelope::new(Frame::Data(DataFrame::Text(Text { utf8: text }))), direction)
                    .await;
            }
            Ok(_) => {}
            Err(err) => tracing::warn!(error = %err, "asr transcribe failed, emitting no text for this utterance"),
        }
    }
}
