use async_trait::async_trait;
use vox_frames::{ControlFrame, DataFrame, Frame, FrameEnvelope, VadState};
use vox_pipeline::{Direction, Processor, ProcessorContext};

use crate::analyzer::VadAnalyzer;

/// Wraps [`VadAnalyzer`] as a pipeline stage: feeds every incoming
/// `AudioRaw` chunk through the analyzer and emits the resulting
/// `VadStateAudio`, plus the edge-triggered `UserStartedSpeaking` /
/// `UserStoppedSpeaking` signal frames upstream, and (when interruption
/// handling is enabled) `StartInterruption` / `StopInterruption` (spec
/// §4.3/§4.4).
pub struct VadProcessor {
    analyzer: VadAnalyzer,
    interruptions_enabled: bool,
    last_emitted_state: Option<VadState>,
}

impl VadProcessor {
    pub fn new(analyzer: VadAnalyzer, interruptions_enabled: bool) -> Self {
        Self {
            analyzer,
            interruptions_enabled,
            last_emitted_state: None,
        }
    }
}

#[async_trait]
impl Processor for VadProcessor {
    fn name(&self) -> &str {
        "vad"
    }

    async fn process_frame(&mut self, frame: FrameEnvelope, direction: Direction, ctx: &ProcessorContext) {
        let audio = match &frame.payload {
            Frame::Data(DataFrame::AudioRaw(audio)) => Some(audio.clone()),
            _ => None,
        };

        let Some(audio) = audio else {
            // Control/system frames and anything we don't segment pass
            // through untouched.
            ctx.queue_frame(frame, direction).await;
            return;
        };

        // A chunk larger than one analysis window completes several windows
        // at once; emit the full downstream/upstream signal sequence for
        // each in order rather than just the last, or the state machine
        // falls behind whenever the caller hands in more than one window
        // per frame.
        for result in self.analyzer.analyze(&audio.bytes) {
            self.emit_result(result, direction, ctx).await;
        }
    }
}

impl VadProcessor {
    async fn emit_result(&mut self, result: vox_frames::VadStateAudio, direction: Direction, ctx: &ProcessorContext) {
        let new_state = result.state;
        let transitioned_to_speaking =
            new_state == VadState::Speaking && self.last_emitted_state != Some(VadState::Speaking);
        let transitioned_to_quiet_after_final = result.is_final && new_state == VadState::Quiet;
        self.last_emitted_state = Some(new_state);

        // UserStartedSpeaking/UserStoppedSpeaking double as segment markers
        // for a downstream response aggregator bundling the VadStateAudio
        // run before ASR, so they also travel alongside the data on
        // `direction`, not only upstream for barge-in.
        if transitioned_to_speaking {
            ctx.queue_frame(
                FrameEnvelope::new(Frame::Control(ControlFrame::UserStartedSpeaking)),
                direction,
            )
            .await;
        }

        ctx.queue_frame(
            FrameEnvelope::new(Frame::Data(DataFrame::VadStateAudio(result))),
            direction,
        )
        .await;

        if transitioned_to_quiet_after_final {
            ctx.queue_frame(
                FrameEnvelope::new(Frame::Control(ControlFrame::UserStoppedSpeaking)),
                direction,
            )
            .await;
        }

        if transitioned_to_speaking {
            ctx.push_frame(FrameEnvelope::new(Frame::Control(ControlFrame::UserStartedSpeaking)), Direction::Upstream)
                .await;
            if self.interruptions_enabled {
                ctx.push_frame(FrameEnvelope::new(Frame::Control(ControlFrame::StartInterruption)), Direction::Upstream)
                    .await;
            }
        }
        if transitioned_to_quiet_after_final {
            ctx.push_frame(FrameEnvelope::new(Frame::Control(ControlFrame::UserStoppedSpeaking)), Direction::Upstream)
                .await;
            if self.interruptions_enabled {
                ctx.push_frame(FrameEnvelope::new(Frame::Control(ControlFrame::StopInterruption)), Direction::Upstream)
                    .await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::{VadAnalyzer, VadAnalyzerConfig};
    use crate::provider::VoiceConfidenceProvider;
    use vox_frames::AudioRaw;
    use vox_pipeline::context::channel;

    struct ScriptedProvider {
        window: usize,
        script: std::collections::VecDeque<bool>,
    }

    impl VoiceConfidenceProvider for ScriptedProvider {
        fn sample_info(&self) -> (u32, usize) {
            (16_000, self.window)
        }

        fn is_active_speech(&mut self, _audio: &[u8]) -> bool {
            self.script.pop_front().unwrap_or(false)
        }
    }

    const WINDOW: usize = 160; // 10ms @ 16kHz mono16

    fn processor_with_script(script: Vec<bool>, start_secs: f64, stop_secs: f64, interruptions_enabled: bool) -> VadProcessor {
        let provider = ScriptedProvider {
            window: WINDOW,
            script: script.into(),
        };
        let config = VadAnalyzerConfig {
            sample_rate: 16_000,
            channels: 1,
            sample_width: 2,
            start_secs,
            stop_secs,
        };
        VadProcessor::new(VadAnalyzer::new(config, Box::new(provider)), interruptions_enabled)
    }

    fn audio_frame() -> FrameEnvelope {
        FrameEnvelope::new(Frame::Data(DataFrame::AudioRaw(AudioRaw::new(
            vec![0u8; WINDOW * 2],
            16_000,
            1,
            2,
        ))))
    }

    async fn drain_all(rx: &mut tokio::sync::mpsc::Receiver<(FrameEnvelope, Direction)>) -> Vec<Frame> {
        let mut out = Vec::new();
        while let Ok((env, _)) = rx.try_recv() {
            out.push(env.payload);
        }
        out
    }

    #[tokio::test]
    async fn speaking_transition_brackets_downstream_and_signals_upstream() {
        // start_secs = 20ms -> 2 consecutive active windows required.
        let mut proc = processor_with_script(vec![true, true], 0.02, 0.32, true);
        let (down_inlet, mut down_rx) = channel(8);
        let (up_inlet, mut up_rx) = channel(8);
        let ctx = ProcessorContext::new(Some(down_inlet), Some(up_inlet), None);

        proc.process_frame(audio_frame(), Direction::Downstream, &ctx).await; // Starting
        let starting_out = drain_all(&mut down_rx).await;
        assert_eq!(starting_out.len(), 1);
        assert!(matches!(&starting_out[0], Frame::Data(DataFrame::VadStateAudio(s)) if s.state == VadState::Starting));
        assert!(drain_all(&mut up_rx).await.is_empty());

        proc.process_frame(audio_frame(), Direction::Downstream, &ctx).await; // Speaking

        let down_out = drain_all(&mut down_rx).await;
        assert_eq!(down_out.len(), 2);
        assert!(matches!(&down_out[0], Frame::Control(ControlFrame::UserStartedSpeaking)));
        assert!(matches!(&down_out[1], Frame::Data(DataFrame::VadStateAudio(s)) if s.state == VadState::Speaking));

        let up_out = drain_all(&mut up_rx).await;
        assert_eq!(up_out.len(), 2);
        assert!(matches!(&up_out[0], Frame::Control(ControlFrame::UserStartedSpeaking)));
        assert!(matches!(&up_out[1], Frame::Control(ControlFrame::StartInterruption)));
    }

    #[tokio::test]
    async fn final_quiet_transition_brackets_downstream_and_signals_upstream() {
        // start_secs tiny, stop_secs = 20ms -> 2 quiet windows to finalize.
        let mut proc = processor_with_script(vec![true, true, false, false], 0.01, 0.02, true);
        let (down_inlet, mut down_rx) = channel(8);
        let (up_inlet, mut up_rx) = channel(8);
        let ctx = ProcessorContext::new(Some(down_inlet), Some(up_inlet), None);

        proc.process_frame(audio_frame(), Direction::Downstream, &ctx).await; // Starting
        proc.process_frame(audio_frame(), Direction::Downstream, &ctx).await; // Speaking
        proc.process_frame(audio_frame(), Direction::Downstream, &ctx).await; // Stopping
        let _ = drain_all(&mut down_rx).await;
        let _ = drain_all(&mut up_rx).await;

        proc.process_frame(audio_frame(), Direction::Downstream, &ctx).await; // Quiet, final

        let down_out = drain_all(&mut down_rx).await;
        assert_eq!(down_out.len(), 2);
        assert!(matches!(&down_out[0], Frame::Data(DataFrame::VadStateAudio(s)) if s.state == VadState::Quiet && s.is_final));
        assert!(matches!(&down_out[1], Frame::Control(ControlFrame::UserStoppedSpeaking)));

        let up_out = drain_all(&mut up_rx).await;
        assert_eq!(up_out.len(), 2);
        assert!(matches!(&up_out[0], Frame::Control(ControlFrame::UserStoppedSpeaking)));
        assert!(matches!(&up_out[1], Frame::Control(ControlFrame::StopInterruption)));
    }

    #[tokio::test]
    async fn interruptions_disabled_suppresses_start_stop_interruption_frames() {
        let mut proc = processor_with_script(vec![true, true], 0.02, 0.32, false);
        let (down_inlet, mut down_rx) = channel(8);
        let (up_inlet, mut up_rx) = channel(8);
        let ctx = ProcessorContext::new(Some(down_inlet), Some(up_inlet), None);

        proc.process_frame(audio_frame(), Direction::Downstream, &ctx).await;
        proc.process_frame(audio_frame(), Direction::Downstream, &ctx).await;

        let _ = drain_all(&mut down_rx).await;
        let up_out = drain_all(&mut up_rx).await;
        assert_eq!(up_out.len(), 1);
        assert!(matches!(&up_out[0], Frame::Control(ControlFrame::UserStartedSpeaking)));
    }

    #[tokio::test]
    async fn chunk_spanning_multiple_windows_emits_one_result_per_window() {
        // start_secs = 20ms -> 2 consecutive active windows required. Feed
        // both windows in a single AudioRaw frame instead of two frames.
        let mut proc = processor_with_script(vec![true, true], 0.02, 0.32, true);
        let (down_inlet, mut down_rx) = channel(8);
        let (up_inlet, mut up_rx) = channel(8);
        let ctx = ProcessorContext::new(Some(down_inlet), Some(up_inlet), None);

        let two_windows = FrameEnvelope::new(Frame::Data(DataFrame::AudioRaw(AudioRaw::new(
            vec![0u8; WINDOW * 2 * 2],
            16_000,
            1,
            2,
        ))));
        proc.process_frame(two_windows, Direction::Downstream, &ctx).await;

        let down_out = drain_all(&mut down_rx).await;
        assert_eq!(down_out.len(), 3);
        assert!(matches!(&down_out[0], Frame::Data(DataFrame::VadStateAudio(s)) if s.state == VadState::Starting));
        assert!(matches!(&down_out[1], Frame::Control(ControlFrame::UserStartedSpeaking)));
        assert!(matches!(&down_out[2], Frame::Data(DataFrame::VadStateAudio(s)) if s.state == VadState::Speaking));

        let up_out = drain_all(&mut up_rx).await;
        assert_eq!(up_out.len(), 2);
        assert!(matches!(&up_out[0], Frame::Control(ControlFrame::UserStartedSpeaking)));
        assert!(matches!(&up_out[1], Frame::Control(ControlFrame::StartInterruption)));
    }

    #[tokio::test]
    async fn non_audio_frames_pass_through_unchanged() {
        let mut proc = processor_with_script(vec![], 0.02, 0.32, true);
        let (down_inlet, mut down_rx) = channel(8);
        let ctx = ProcessorContext::new(Some(down_inlet), None, None);

        proc.process_frame(
            FrameEnvelope::new(Frame::Control(ControlFrame::UserStartedSpeaking)),
            Direction::Downstream,
            &ctx,
        )
        .await;

        let out = drain_all(&mut down_rx).await;
        assert_eq!(out.len(), 1);
        assert!(matches!(&out[0], Frame::Control(ControlFrame::UserStartedSpeaking)));
    }
}
