//! Per-connection pipeline assembly: wires the VAD, response aggregation,
//! ASR, LLM turn orchestration, TTS, and audio/camera output stages around
//! one transport, then drives it until the peer disconnects or shutdown is
//! requested.

use std::sync::Arc;

use axum::extract::ws::WebSocket;
use serde_json::json;
use uuid::Uuid;
use vox_aggregator::AudioResponseAggregator;
use vox_audio_output::{AudioCameraConfig, AudioCameraOutputProcessor, TransportWriter};
use vox_chat::Session as ChatSession;
use vox_foundation::config::ServerConfig;
use vox_foundation::shutdown::ShutdownGuard;
use vox_frames::{ControlFrame, DataFrame};
use vox_llm::{ChatMode, LlmProcessor, ToolRegistry, TurnOrchestrator};
use vox_pipeline::{Pipeline, Processor, StageKind};
use vox_pool::Pool;
use vox_transport::{JsonSerializer, Transport, TransportConfig};
use vox_vad::analyzer::{VadAnalyzer, VadAnalyzerConfig};
use vox_vad::provider::EnergyThresholdProvider;
use vox_vad::VadProcessor;

use crate::providers::llm::{EchoLlmProvider, GetWeatherTool};
use crate::providers::{AsrProcessor, PooledAsr, PooledTts, TtsProcessor};
use crate::transport_ws;

/// Drives one upgraded WebSocket connection end to end. Returns once the
/// peer disconnects or the server-wide shutdown guard fires.
pub async fn run(
    socket: WebSocket,
    config: Arc<ServerConfig>,
    asr_pool: Arc<Pool<PooledAsr>>,
    tts_pool: Arc<Pool<PooledTts>>,
    shutdown: ShutdownGuard,
) {
    let session_id = Uuid::new_v4().to_string();
    let (sink, source) = transport_ws::split(socket);
    let transport = Arc::new(Transport::new(
        sink,
        Arc::new(JsonSerializer),
        TransportConfig {
            audio_out_sample_rate: config.audio.sample_rate,
            audio_out_channels: config.audio.channels,
            audio_out_sample_width: config.audio.sample_width,
            ..TransportConfig::default()
        },
    ));

    let writer: Arc<dyn TransportWriter> = transport.clone();
    let mut pipeline = build_pipeline(&config, asr_pool, tts_pool, writer.clone(), &session_id);

    if let Err(err) = pipeline.start().await {
        tracing::warn!(%session_id, error = %err, "pipeline failed to start");
        return;
    }

    let mut read_handle = {
        let transport = transport.clone();
        let vad_input = pipeline.downstream_inlet();
        tokio::spawn(async move {
            if let Err(err) = transport.read_loop(source, vad_input).await {
                tracing::warn!(error = %err, "transport read loop ended with error");
            }
        })
    };

    // Both out-queues, plus the read task and the server shutdown signal,
    // are polled from this one task since `Pipeline::recv_*` takes `&mut
    // self` and `end_and_drain` needs to consume the same pipeline.
    loop {
        tokio::select! {
            frame = pipeline.recv_any_out() => {
                let Some((frame, _direction)) = frame else { break };
                if let Err(err) = writer.write_frame(&frame.payload).await {
                    tracing::debug!(%session_id, error = %err, "failed forwarding frame to client");
                }
            }
            _ = &mut read_handle => break,
            _ = shutdown.wait() => {
                tracing::info!(%session_id, "server shutdown requested, ending session");
                break;
            }
        }
    }

    read_handle.abort();
    if let Err(err) = pipeline.end_and_drain().await {
        tracing::warn!(%session_id, error = %err, "pipeline drain failed");
    }
}

fn build_pipeline(
    config: &ServerConfig,
    asr_pool: Arc<Pool<PooledAsr>>,
    tts_pool: Arc<Pool<PooledTts>>,
    writer: Arc<dyn TransportWriter>,
    session_id: &str,
) -> Pipeline {
    let vad_analyzer = VadAnalyzer::new(
        VadAnalyzerConfig {
            sample_rate: config.audio.sample_rate,
            channels: config.audio.channels,
            sample_width: config.audio.sample_width,
            start_secs: config.vad.start_secs,
            stop_secs: config.vad.stop_secs,
        },
        Box::new(EnergyThresholdProvider::new(config.audio.sample_rate, 512, 0.02)),
    );
    let vad = VadProcessor::new(vad_analyzer, config.vad.interruptions_enabled);

    let aggregator = AudioResponseAggregator::new(ControlFrame::UserStartedSpeaking, ControlFrame::UserStoppedSpeaking, |df| {
        matches!(df, DataFrame::VadStateAudio(_))
    });

    let asr = AsrProcessor::new(asr_pool);

    let mut tools = ToolRegistry::new();
    tools.register(Arc::new(GetWeatherTool));
    let orchestrator = TurnOrchestrator::new(Arc::new(EchoLlmProvider), tools, false, false);
    let mut chat_session = ChatSession::new(session_id.to_string(), config.chat.history_size);
    chat_session.init_chat_message(json!({"role": "system", "content": "You are a helpful voice assistant."}));
    let llm = LlmProcessor::new(orchestrator, chat_session, ChatMode::Chat);

    let tts = TtsProcessor::new(tts_pool, config.audio.sample_rate, config.audio.channels, config.audio.sample_width);

    let output = AudioCameraOutputProcessor::new(
        AudioCameraConfig {
            audio_out_sample_rate: config.audio.sample_rate,
            audio_out_channels: config.audio.channels,
            ..AudioCameraConfig::default()
        },
        writer,
    );

    let stages: Vec<(Box<dyn Processor>, StageKind)> = vec![
        (Box::new(vad), StageKind::Async { capacity: 0 }),
        (Box::new(aggregator), StageKind::Sync),
        (Box::new(asr), StageKind::Async { capacity: 0 }),
        (Box::new(llm), StageKind::Async { capacity: 0 }),
        (Box::new(tts), StageKind::Async { capacity: 0 }),
        (Box::new(output), StageKind::Async { capacity: 0 }),
    ];
    Pipeline::new(stages, 0)
}
