use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use vox_audio_output::TransportWriter;
use vox_foundation::error::VoxError;
use vox_frames::{AudioRaw, ControlFrame, DataFrame, Frame};
use vox_pipeline::{Direction, Inlet};

use crate::serializer::{looks_like_text, FrameSerializer};
use crate::sink::{MessageKind, MessageSink, MessageSource};
use crate::wav::wrap_wav;

#[derive(Debug, Clone, Copy)]
pub struct TransportConfig {
    pub audio_out_sample_rate: u32,
    pub audio_out_channels: u16,
    pub audio_out_sample_width: u16,
    pub audio_out_frame_size: usize,
    pub audio_out_add_wav_header: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            audio_out_sample_rate: 16_000,
            audio_out_channels: 1,
            audio_out_sample_width: 2,
            audio_out_frame_size: 640,
            audio_out_add_wav_header: false,
        }
    }
}

struct TransportState {
    audio_buffer: Vec<u8>,
}

/// Single-writer duplex adapter (spec §4.9, §6). `S` is the concrete
/// connection (a WebSocket, a test double); everything here — buffering,
/// WAV framing, payload-kind selection, and the write mutex — is
/// transport-agnostic.
pub struct Transport<S: MessageSink> {
    pub(crate) sink: S,
    serializer: Arc<dyn FrameSerializer>,
    config: TransportConfig,
    state: Mutex<TransportState>,
}

impl<S: MessageSink> Transport<S> {
    pub fn new(sink: S, serializer: Arc<dyn FrameSerializer>, config: TransportConfig) -> Self {
        Self {
            sink,
            serializer,
            config,
            state: Mutex::new(TransportState {
                audio_buffer: Vec::new(),
            }),
        }
    }

    async fn send_frame(&self, frame: &Frame) -> Result<(), VoxError> {
        let payload = self.serializer.serialize(frame)?;
        if payload.is_empty() {
            tracing::warn!(kind = frame.kind_name(), "serialize produced no payload");
            return Ok(());
        }
        let kind = if looks_like_text(&payload) {
            MessageKind::Text
        } else {
            MessageKind::Binary
        };
        self.sink.send(kind, payload).await
    }

    /// Reads decoded frames off `source` until it closes, routing `AudioRaw`
    /// into `vad_input` and dropping everything else with a warning (spec
    /// §4.9, §6: inbound discipline). Decode errors are log-and-skip, not
    /// session-terminating (spec §7); a closed source ends the loop.
    pub async fn read_loop<M: MessageSource>(&self, mut source: M, vad_input: Inlet) -> Result<(), VoxError> {
        loop {
            let Some((kind, payload)) = source.recv().await? else {
                return Ok(());
            };
            if kind != MessageKind::Binary {
                tracing::warn!("dropping non-binary inbound payload");
                continue;
            }
            let frame = match self.serializer.deserialize(&payload) {
                Ok(frame) => frame,
                Err(err) => {
                    tracing::warn!(error = %err, "dropping undecodable inbound payload");
                    continue;
                }
            };
            match frame {
                Frame::Data(DataFrame::AudioRaw(_)) => {
                    let envelope = vox_frames::FrameEnvelope::new(frame);
                    if vad_input.send(envelope, Direction::Downstream).await.is_err() {
                        return Ok(());
                    }
                }
                other => {
                    tracing::warn!(kind = other.kind_name(), "dropping unsupported inbound frame kind");
                }
            }
        }
    }
}

#[async_trait]
impl<S: MessageSink> TransportWriter for Transport<S> {
    async fn write_raw_audio(&self, bytes: &[u8]) -> Result<(), VoxError> {
        let mut state = self.state.lock().await;
        state.audio_buffer.extend_from_slice(bytes);

        while state.audio_buffer.len() >= self.config.audio_out_frame_size {
            let chunk: Vec<u8> = state.audio_buffer.drain(..self.config.audio_out_frame_size).collect();
            let chunk = if self.config.audio_out_add_wav_header && !chunk.is_empty() {
                wrap_wav(
                    &chunk,
                    self.config.audio_out_sample_rate,
                    self.config.audio_out_channels,
                    self.config.audio_out_sample_width,
                )
            } else {
                chunk
            };
            let frame = Frame::Data(DataFrame::AudioRaw(AudioRaw::new(
                chunk,
                self.config.audio_out_sample_rate,
                self.config.audio_out_channels,
                self.config.audio_out_sample_width,
            )));
            self.send_frame(&frame).await?;
        }
        Ok(())
    }

    async fn write_frame(&self, frame: &Frame) -> Result<(), VoxError> {
        let _guard = self.state.lock().await;
        match frame {
            Frame::Data(DataFrame::Text(_)) | Frame::Control(ControlFrame::StartInterruption) => {
                self.send_frame(frame).await
            }
            Frame::Data(DataFrame::TransportMessage(message)) => {
                let kind = if looks_like_text(&message.payload_bytes) {
                    MessageKind::Text
                } else {
                    MessageKind::Binary
                };
                self.sink.send(kind, message.payload_bytes.clone()).await
            }
            Frame::Data(DataFrame::AnimationAudio(animation)) => {
                if self.config.audio_out_add_wav_header && !animation.audio.bytes.is_empty() {
                    let wrapped = wrap_wav(
                        &animation.audio.bytes,
                        animation.audio.sample_rate,
                        animation.audio.channels,
                        animation.audio.sample_width,
                    );
                    let data = DataFrame::AnimationAudio(animation.clone())
                        .with_audio_bytes(wrapped)
                        .expect("AnimationAudio carries audio bytes");
                    self.send_frame(&Frame::Data(data)).await
                } else {
                    self.send_frame(frame).await
                }
            }
            other => {
                tracing::debug!(kind = other.kind_name(), "write_frame: kind not written directly");
                Ok(())
            }
        }
    }
}
