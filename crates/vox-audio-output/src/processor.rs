use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use vox_frames::{ControlFrame, DataFrame, Frame, FrameEnvelope, ImageRaw};
use vox_pipeline::{Direction, Processor, ProcessorContext};
use vox_telemetry::PipelineMetrics;

use crate::config::AudioCameraConfig;
use crate::writer::TransportWriter;

const AUDIO_QUEUE_CAPACITY: usize = 100;
const CAMERA_QUEUE_CAPACITY: usize = 100;
/// Drift beyond which the camera clock resyncs instead of sleeping it off
/// (spec §4.8), expressed as a frame-duration multiplier.
const DRIFT_RESET_FRAMES: u32 = 5;

enum AudioItem {
    Chunk { generation: u64, bytes: Vec<u8> },
}

/// Output stage: chunks outbound audio, tracks the bot-speaking lifecycle,
/// and (optionally) drives a live or slideshow camera feed (spec §4.8).
/// Interruption drains the audio queue by generation-stamping rather than
/// recreating the channel: bumping the generation makes every chunk queued
/// before the interruption silently skip its write.
pub struct AudioCameraOutputProcessor {
    config: AudioCameraConfig,
    writer: Arc<dyn TransportWriter>,
    metrics: Option<PipelineMetrics>,

    generation: Arc<AtomicU64>,
    bot_speaking: bool,

    audio_tx: Option<mpsc::Sender<AudioItem>>,
    audio_task: Option<JoinHandle<()>>,

    camera_tx: Option<mpsc::Sender<ImageRaw>>,
    camera_task: Option<JoinHandle<()>>,
    camera_slideshow: Arc<tokio::sync::Mutex<Vec<ImageRaw>>>,
}

impl AudioCameraOutputProcessor {
    pub fn new(config: AudioCameraConfig, writer: Arc<dyn TransportWriter>) -> Self {
        Self {
            config,
            writer,
            metrics: None,
            generation: Arc::new(AtomicU64::new(0)),
            bot_speaking: false,
            audio_tx: None,
            audio_task: None,
            camera_tx: None,
            camera_task: None,
            camera_slideshow: Arc::new(tokio::sync::Mutex::new(Vec::new())),
        }
    }

    pub fn with_metrics(mut self, metrics: PipelineMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    fn spawn_audio_task(&mut self) {
        let (tx, mut rx) = mpsc::channel::<AudioItem>(AUDIO_QUEUE_CAPACITY);
        let writer = self.writer.clone();
        let generation = self.generation.clone();
        let handle = tokio::spawn(async move {
            while let Some(AudioItem::Chunk { generation: gen, bytes }) = rx.recv().await {
                if gen != generation.load(Ordering::Acquire) {
                    continue; // interrupted: drop silently instead of writing stale audio
                }
                if let Err(err) = writer.write_raw_audio(&bytes).await {
                    tracing::warn!(error = %err, "audio_out_task write failed");
                }
            }
        });
        self.audio_tx = Some(tx);
        self.audio_task = Some(handle);
    }

    fn spawn_camera_task(&mut self) {
        if !self.config.camera_out_enabled {
            return;
        }
        let (tx, rx) = mpsc::channel::<ImageRaw>(CAMERA_QUEUE_CAPACITY);
        let writer = self.writer.clone();
        let config = self.config;
        let slideshow = self.camera_slideshow.clone();
        let handle = tokio::spawn(camera_loop(rx, writer, config, slideshow));
        self.camera_tx = Some(tx);
        self.camera_task = Some(handle);
    }

    async fn handle_audio(&mut self, bytes: &[u8], ctx: &ProcessorContext) {
        if !self.config.audio_out_enabled {
            return;
        }
        let Some(tx) = &self.audio_tx else { return };
        let chunk_size = self.config.audio_chunk_size().max(1);
        let generation = self.generation.load(Ordering::Acquire);
        for chunk in bytes.chunks(chunk_size) {
            if tx
                .send(AudioItem::Chunk {
                    generation,
                    bytes: chunk.to_vec(),
                })
                .await
                .is_err()
            {
                return;
            }
            ctx.push_frame(FrameEnvelope::new(Frame::Control(ControlFrame::BotSpeaking)), Direction::Upstream)
                .await;
        }
    }

    async fn bot_started_speaking(&mut self, ctx: &ProcessorContext) {
        self.bot_speaking = true;
        if let Some(metrics) = &self.metrics {
            metrics.record_bot_speaking(true);
        }
        ctx.push_frame(
            FrameEnvelope::new(Frame::Control(ControlFrame::BotStartedSpeaking)),
            Direction::Upstream,
        )
        .await;
    }

    async fn bot_stopped_speaking(&mut self, ctx: &ProcessorContext) {
        self.bot_speaking = false;
        if let Some(metrics) = &self.metrics {
            metrics.record_bot_speaking(false);
        }
        ctx.push_frame(
            FrameEnvelope::new(Frame::Control(ControlFrame::BotStoppedSpeaking)),
            Direction::Upstream,
        )
        .await;
    }

    async fn join_workers(&mut self) {
        self.audio_tx.take();
        if let Some(handle) = self.audio_task.take() {
            let _ = handle.await;
        }
        self.camera_tx.take();
        if let Some(handle) = self.camera_task.take() {
            handle.abort();
        }
    }
}

async fn camera_loop(
    mut rx: mpsc::Receiver<ImageRaw>,
    writer: Arc<dyn TransportWriter>,
    config: AudioCameraConfig,
    slideshow: Arc<tokio::sync::Mutex<Vec<ImageRaw>>>,
) {
    let frame_duration = Duration::from_secs_f64(1.0 / config.camera_out_framerate.max(1) as f64);
    let drift_reset = frame_duration * DRIFT_RESET_FRAMES;
    let mut start_time: Option<Instant> = None;
    let mut frame_index: u64 = 0;

    loop {
        if config.camera_out_is_live {
            let Some(image) = rx.recv().await else { return };
            let now = Instant::now();
            let start = *start_time.get_or_insert(now);
            let real_elapsed = now.duration_since(start);
            let real_render_time = frame_duration * frame_index as u32;
            let delay = (frame_duration + real_render_time).checked_sub(real_elapsed);

            match delay {
                Some(d) if d > drift_reset => {
                    start_time = Some(now);
                    frame_index = 0;
                }
                Some(d) => {
                    tokio::time::sleep(d).await;
                    frame_index += 1;
                }
                None => {
                    start_time = Some(now);
                    frame_index = 0;
                }
            }
            if let Err(err) = writer.write_frame(&Frame::Data(DataFrame::ImageRaw(image))).await {
                tracing::warn!(error = %err, "camera write failed");
            }
        } else {
            let images = slideshow.lock().await;
            if images.is_empty() {
                drop(images);
                tokio::time::sleep(frame_duration).await;
                continue;
            }
            let index = (frame_index as usize) % images.len();
            let image = images[index].clone();
            drop(images);
            frame_index += 1;
            if let Err(err) = writer.write_frame(&Frame::Data(DataFrame::ImageRaw(image))).await {
                tracing::warn!(error = %err, "camera write failed");
            }
            tokio::time::sleep(frame_duration).await;
        }
    }
}

#[async_trait]
impl Processor for AudioCameraOutputProcessor {
    fn name(&self) -> &str {
        "audio-camera-output"
    }

    async fn on_start(&mut self, _ctx: &ProcessorContext) {
        self.spawn_audio_task();
        self.spawn_camera_task();
    }

    async fn on_end(&mut self, _ctx: &ProcessorContext) {
        self.join_workers().await;
    }

    async fn on_cancel(&mut self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.audio_tx.take();
        if let Some(handle) = self.audio_task.take() {
            handle.abort();
        }
        self.camera_tx.take();
        if let Some(handle) = self.camera_task.take() {
            handle.abort();
        }
    }

    async fn process_frame(&mut self, frame: FrameEnvelope, direction: Direction, ctx: &ProcessorContext) {
        match &frame.payload {
            Frame::Control(ControlFrame::TtsStarted) => {
                self.bot_started_speaking(ctx).await;
                ctx.queue_frame(frame, direction).await;
            }
            Frame::Control(ControlFrame::TtsStopped) => {
                self.bot_stopped_speaking(ctx).await;
                ctx.queue_frame(frame, direction).await;
            }
            Frame::Control(ControlFrame::StartInterruption) => {
                if self.bot_speaking {
                    self.bot_stopped_speaking(ctx).await;
                }
                self.generation.fetch_add(1, Ordering::AcqRel);
                if let Some(metrics) = &self.metrics {
                    metrics.record_interruption();
                }
                ctx.push_frame(frame, direction).await;
            }
            Frame::Data(DataFrame::AudioRaw(audio)) => {
                let bytes = audio.bytes.clone();
                self.handle_audio(&bytes, ctx).await;
            }
            Frame::Data(DataFrame::ImageRaw(image)) => {
                if self.config.camera_out_enabled {
                    if self.config.camera_out_is_live {
                        if let Some(tx) = &self.camera_tx {
                            let _ = tx.send(image.clone()).await;
                        }
                    } else {
                        *self.camera_slideshow.lock().await = vec![image.clone()];
                    }
                }
            }
            Frame::Data(DataFrame::Sprite(sprite)) => {
                if self.config.camera_out_enabled && !self.config.camera_out_is_live {
                    *self.camera_slideshow.lock().await = sprite.images.clone();
                }
            }
            Frame::Data(DataFrame::TransportMessage(_))
            | Frame::Data(DataFrame::Text(_))
            | Frame::Data(DataFrame::AnimationAudio(_)) => {
                if let Err(err) = self.writer.write_frame(&frame.payload).await {
                    tracing::warn!(error = %err, kind = frame.name, "direct frame write failed");
                }
            }
            _ => {
                ctx.queue_frame(frame, direction).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vox_frames::AudioRaw;
    use vox_pipeline::context::channel;

    struct RecordingWriter {
        raw_audio: tokio::sync::Mutex<Vec<Vec<u8>>>,
    }

    impl RecordingWriter {
        fn new() -> Self {
            Self {
                raw_audio: tokio::sync::Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl TransportWriter for RecordingWriter {
        async fn write_raw_audio(&self, bytes: &[u8]) -> Result<(), VoxError> {
            self.raw_audio.lock().await.push(bytes.to_vec());
            Ok(())
        }

        async fn write_frame(&self, _frame: &Frame) -> Result<(), VoxError> {
            Ok(())
        }
    }

    use vox_foundation::error::VoxError;

    fn control(c: ControlFrame) -> FrameEnvelope {
        FrameEnvelope::new(Frame::Control(c))
    }

    fn audio(bytes: Vec<u8>) -> FrameEnvelope {
        FrameEnvelope::new(Frame::Data(DataFrame::AudioRaw(AudioRaw::new(bytes, 16_000, 1, 2))))
    }

    async fn drain_upstream(rx: &mut mpsc::Receiver<(FrameEnvelope, Direction)>) -> Vec<FrameEnvelope> {
        let mut out = Vec::new();
        while let Ok(item) = rx.try_recv() {
            out.push(item.0);
        }
        out
    }

    #[tokio::test]
    async fn chunks_audio_into_configured_size_and_emits_heartbeat() {
        let writer = Arc::new(RecordingWriter::new());
        let mut proc = AudioCameraOutputProcessor::new(AudioCameraConfig::default(), writer.clone());
        let (upstream_inlet, mut upstream_rx) = channel(16);
        let ctx = ProcessorContext::new(None, Some(upstream_inlet), None);

        proc.on_start(&ctx).await;
        let bytes = vec![7u8; 640 * 2];
        proc.process_frame(audio(bytes.clone()), Direction::Downstream, &ctx).await;
        proc.on_end(&ctx).await;

        let written = writer.raw_audio.lock().await;
        assert_eq!(written.len(), 2);
        assert!(written.iter().all(|chunk| chunk.len() == 640));

        let heartbeats = drain_upstream(&mut upstream_rx).await;
        assert_eq!(heartbeats.len(), 2);
        for frame in &heartbeats {
            assert!(matches!(frame.payload, Frame::Control(ControlFrame::BotSpeaking)));
        }
    }

    #[tokio::test]
    async fn tts_lifecycle_toggles_bot_speaking_and_forwards() {
        let writer = Arc::new(RecordingWriter::new());
        let mut proc = AudioCameraOutputProcessor::new(AudioCameraConfig::default(), writer);
        let (downstream_inlet, mut downstream_rx) = channel(16);
        let (upstream_inlet, mut upstream_rx) = channel(16);
        let ctx = ProcessorContext::new(Some(downstream_inlet), Some(upstream_inlet), None);

        proc.on_start(&ctx).await;
        proc.process_frame(control(ControlFrame::TtsStarted), Direction::Downstream, &ctx).await;
        assert!(proc.bot_speaking);
        proc.process_frame(control(ControlFrame::TtsStopped), Direction::Downstream, &ctx).await;
        assert!(!proc.bot_speaking);
        proc.on_end(&ctx).await;

        let forwarded = drain_upstream(&mut downstream_rx).await;
        assert_eq!(forwarded.len(), 2);

        let signals = drain_upstream(&mut upstream_rx).await;
        assert_eq!(signals.len(), 2);
        assert!(matches!(signals[0].payload, Frame::Control(ControlFrame::BotStartedSpeaking)));
        assert!(matches!(signals[1].payload, Frame::Control(ControlFrame::BotStoppedSpeaking)));
    }

    #[tokio::test]
    async fn interruption_drains_stale_generation_chunks() {
        let writer = Arc::new(RecordingWriter::new());
        let mut proc = AudioCameraOutputProcessor::new(AudioCameraConfig::default(), writer.clone());
        let (upstream_inlet, _upstream_rx) = channel(16);
        let ctx = ProcessorContext::new(None, Some(upstream_inlet), None);

        proc.on_start(&ctx).await;
        proc.process_frame(audio(vec![1u8; 640]), Direction::Downstream, &ctx).await;
        proc.process_frame(control(ControlFrame::StartInterruption), Direction::Downstream, &ctx).await;
        proc.process_frame(audio(vec![2u8; 640]), Direction::Downstream, &ctx).await;
        proc.on_end(&ctx).await;

        let written = writer.raw_audio.lock().await;
        assert_eq!(written.len(), 1);
        assert_eq!(written[0], vec![2u8; 640]);
    }
}
