//! TTS adapter: the external text-to-speech model wrapper's interface and a
//! pipeline stage that buffers incoming text to sentence boundaries before
//! synthesizing, bracketing each synthesis burst with `TtsStarted`/
//! `TtsStopped` for the output stage's bot-speaking lifecycle.

use std::sync::Arc;

use async_trait::async_trait;
use vox_foundation::error::VoxError;
use vox_frames::{AudioRaw, ControlFrame, DataFrame, Frame, FrameEnvelope};
use vox_pipeline::{Direction, Processor, ProcessorContext};
use vox_pool::{Pool, PoolInstance};

#[async_trait]
pub trait TtsProvider: Send {
    /// Sample format this provider renders into; fixed per-instance.
    fn sample_info(&self) -> (u32, u16, u16);

    async fn synthesize(&mut self, text: &str) -> Result<Vec<u8>, VoxError>;

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

pub struct PooledTts(pub Box<dyn TtsProvider>);

impl PoolInstance for PooledTts {
    fn reset(&mut self) -> Result<(), VoxError> {
        self.0.reset()
    }

    fn release(self) -> Result<(), VoxError> {
        self.0.release()
    }
}

/// Deterministic stand-in backend: renders silence proportional to the
/// sentence length rather than running a real model, so the output stage
/// still sees audio of a plausible duration.
pub struct MockTtsProvider {
    sample_rate: u32,
    channels: u16,
    sample_width: u16,
}

impl MockTtsProvider {
    pub fn new(sample_rate: u32, channels: u16, sample_width: u16) -> Self {
        Self {
            sample_rate,
            channels,
            sample_width,
        }
    }
}

#[async_trait]
impl TtsProvider for MockTtsProvider {
    fn sample_info(&self) -> (u32, u16, u16) {
        (self.sample_rate, self.channels, self.sample_width)
    }

    async fn synthesize(&mut self, text: &str) -> Result<Vec<u8>, VoxError> {
        const MS_PER_CHAR: usize = 40;
        let millis = text.chars().count() * MS_PER_CHAR;
        let per_frame = self.channels as usize * self.sample_width as usize;
        let frames = (self.sample_rate as usize * millis) / 1000;
        Ok(vec![0u8; frames * per_frame])
    }
}

fn drain_sentences(buffer: &mut String) -> Vec<String> {
    let mut boundaries = Vec::new();
    for (i, ch) in buffer.char_indices() {
        if matches!(ch, '.' | '!' | '?') {
            boundaries.push(i + ch.len_utf8());
        }
    }
    let mut sentences = Vec::with_capacity(boundaries.len());
    let mut start = 0;
    for boundary in &boundaries {
        sentences.push(buffer[start..*boundary].trim().to_string());
        start = *boundary;
    }
    *buffer = buffer[start..].to_string();
    sentences.into_iter().filter(|s| !s.is_empty()).collect()
}

/// Pipeline stage (spec §2 "TTS adapter" / "sentence aggregator"). Unlike
/// the audio-only response aggregator (C5), grouping text into speakable
/// units here is this stage's own job, since nothing upstream produces
/// sentence-bounded text frames.
pub struct TtsProcessor {
    pool: Arc<Pool<PooledTts>>,
    sample_rate: u32,
    channels: u16,
    sample_width: u16,
    buffer: String,
    speaking: bool,
}

impl TtsProcessor {
    pub fn new(pool: Arc<Pool<PooledTts>>, sample_rate: u32, channels: u16, sample_width: u16) -> Self {
        Self {
            pool,
            sample_rate,
            channels,
            sample_width,
            buffer: String::new(),
            speaking: false,
        }
    }

    async fn synthesize_each(&mut self, sentences: Vec<String>, direction: Direction, ctx: &ProcessorContext) {
        for sentence in sentences {
            if !self.speaking {
                ctx.queue_frame(FrameEnvelope::new(Frame::Control(ControlFrame::TtsStarted)), direction)
                    .await;
                self.speaking = true;
            }

            let mut instance = match self.pool.get().await {
                Ok(instance) => instance,
                Err(err) => {
                    tracing::warn!(error = %err, "tts pool get failed, dropping sentence");
                    continue;
                }
            };
            let synthesized = instance.0.synthesize(&sentence).await;
            self.pool.put(instance).await;

            match synthesized {
                Ok(bytes) if !bytes.is_empty() => {
                    let audio = AudioRaw::new(bytes, self.sample_rate, self.channels, self.sample_width);
                    ctx.queue_frame(FrameEnvelope::new(Frame::Data(DataFrame::AudioRaw(audio))), direction)
                        .await;
                }
                Ok(_) => {}
                Err(err) => tracing::warn!(error = %err, "tts synthesize failed, skipping sentence"),
            }
        }
    }

    async fn flush_and_stop(&mut self, direction: Direction, ctx: &ProcessorContext) {
        let remainder = self.buffer.trim();
        if !remainder.is_empty() {
            let sentence = remainder.to_string();
            self.buffer.clear();
            self.synthesize_each(vec![sentence], direction, ctx).await;
        }
        if self.speaking {
            ctx.queue_frame(FrameEnvelope::new(Frame::Control(ControlFrame::TtsStopped)), direction)
                .await;
            self.speaking = false;
        }
    }
}

#[async_trait]
impl Processor for TtsProcessor {
    fn name(&self) -> &str {
        "tts-adapter"
    }

    async fn process_frame(&mut self, frame: FrameEnvelope, direction: Direction, ctx: &ProcessorContext) {
        match &frame.payload {
            Frame::Data(DataFrame::Text(t)) => {
                self.buffer.push_str(&t.utf8);
                let sentences = drain_sentences(&mut self.buffer);
                if !sentences.is_empty() {
                    self.synthesize_each(sentences, direction, ctx).await;
                }
            }
            Frame::Control(ControlFrame::TurnEnd) => {
                self.flush_and_stop(direction, ctx).await;
                ctx.queue_frame(frame, direction).await;
            }
            Frame::Control(ControlFrame::Cancel) => {
                self.buffer.clear();
                self.speaking = false;
                ctx.queue_frame(frame, direction).await;
            }
            _ => ctx.queue_frame(frame, direction).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drain_sentences_keeps_partial_trailing_text_buffered() {
        let mut buffer = "Hello there. How are".to_string();
        let sentences = drain_sentences(&mut buffer);
        assert_eq!(sentences, vec!["Hello there.".to_string()]);
        assert_eq!(buffer, " How are");
    }

    #[test]
    fn drain_sentences_handles_multiple_boundaries_in_one_call() {
        let mut buffer = "One. Two! Three?".to_string();
        let sentences = drain_sentences(&mut buffer);
        assert_eq!(sentences, vec!["One.".to_string(), "Two!".to_string(), "Three?".to_string()]);
        assert_eq!(buffer, "");
    }
}
