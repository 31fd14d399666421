//! Audio response aggregation (spec §4.5): accumulates streamed audio
//! frames between a start and end marker into a single frame, tolerating
//! an interim-results phase that delays the flush until the final audio
//! actually lands.

use async_trait::async_trait;
use vox_frames::{ControlFrame, DataFrame, Frame, FrameEnvelope};
use vox_pipeline::{Direction, Processor, ProcessorContext};

/// Aggregates [`DataFrame`] payloads that carry audio between a `start` and
/// `end` control marker, replacing per-chunk frames with one frame carrying
/// the concatenated bytes (spec §4.5). The emitted frame keeps the variant
/// and sample format of whichever accumulator frame was last seen.
///
/// `is_accumulator` selects which data-frame kinds are accumulated (a
/// closed match, not runtime type inspection — see REDESIGN FLAGS).
/// `is_interim` optionally marks kinds that signal "more audio is still
/// coming" even after `end` arrives, deferring the flush until interim
/// results stop (used for streaming TTS with partial results).
pub struct AudioResponseAggregator {
    start: ControlFrame,
    end: ControlFrame,
    is_accumulator: Box<dyn Fn(&DataFrame) -> bool + Send>,
    is_interim: Option<Box<dyn Fn(&DataFrame) -> bool + Send>>,

    aggregation: Vec<u8>,
    aggregating: bool,
    seen_start_frame: bool,
    seen_end_frame: bool,
    seen_interim_results: bool,
    cur_frame: Option<DataFrame>,
}

impl AudioResponseAggregator {
    pub fn new(
        start: ControlFrame,
        end: ControlFrame,
        is_accumulator: impl Fn(&DataFrame) -> bool + Send + 'static,
    ) -> Self {
        Self {
            start,
            end,
            is_accumulator: Box::new(is_accumulator),
            is_interim: None,
            aggregation: Vec::new(),
            aggregating: false,
            seen_start_frame: false,
            seen_end_frame: false,
            seen_interim_results: false,
            cur_frame: None,
        }
    }

    pub fn with_interim(
        start: ControlFrame,
        end: ControlFrame,
        is_accumulator: impl Fn(&DataFrame) -> bool + Send + 'static,
        is_interim: impl Fn(&DataFrame) -> bool + Send + 'static,
    ) -> Self {
        let mut a = Self::new(start, end, is_accumulator);
        a.is_interim = Some(Box::new(is_interim));
        a
    }

    fn reset(&mut self) {
        self.aggregation.clear();
        self.aggregating = false;
        self.seen_start_frame = false;
        self.seen_end_frame = false;
        self.seen_interim_results = false;
        self.cur_frame = None;
    }

    async fn push_aggregation(&mut self, direction: Direction, ctx: &ProcessorContext) {
        if self.aggregation.is_empty() {
            return;
        }
        let Some(cur) = self.cur_frame.clone() else {
            tracing::warn!("aggregation has bytes but no current frame to attach them to");
            self.reset();
            return;
        };
        match cur.with_audio_bytes(std::mem::take(&mut self.aggregation)) {
            Some(replaced) => {
                ctx.queue_frame(FrameEnvelope::new(Frame::Data(replaced)), direction).await;
            }
            None => {
                tracing::warn!(kind = cur.kind_name(), "frame kind does not carry replaceable audio");
            }
        }
        self.reset();
    }
}

#[async_trait]
impl Processor for AudioResponseAggregator {
    fn name(&self) -> &str {
        "audio-response-aggregator"
    }

    async fn process_frame(&mut self, frame: FrameEnvelope, direction: Direction, ctx: &ProcessorContext) {
        let mut send_aggregation = false;

        match &frame.payload {
            Frame::Control(c) if *c == self.start => {
                self.aggregating = true;
                self.seen_start_frame = true;
                self.seen_end_frame = false;
                self.seen_interim_results = false;
                ctx.queue_frame(frame, direction).await;
                return;
            }
            Frame::Control(c) if *c == self.end => {
                self.seen_end_frame = true;
                self.seen_start_frame = false;
                // Interim results may still be in flight even though `end`
                // arrived; keep aggregating until they stop.
                self.aggregating = self.seen_interim_results || self.aggregation.is_empty();
                send_aggregation = !self.aggregating;
                ctx.queue_frame(frame, direction).await;
            }
            Frame::Data(data) if (self.is_accumulator)(data) => {
                if self.aggregating {
                    match data.audio_bytes() {
                        Some(bytes) => {
                            self.cur_frame = Some(data.clone());
                            self.aggregation.extend_from_slice(bytes);
                            send_aggregation = self.seen_end_frame;
                        }
                        None => tracing::warn!(kind = data.kind_name(), "accumulator frame carries no audio"),
                    }
                }
                self.seen_interim_results = false;
            }
            Frame::Data(data) if self.is_interim.as_ref().is_some_and(|f| f(data)) => {
                self.seen_interim_results = true;
            }
            _ => {
                ctx.queue_frame(frame, direction).await;
                return;
            }
        }

        if send_aggregation {
            self.push_aggregation(direction, ctx).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vox_frames::AudioRaw;
    use vox_pipeline::context::channel;

    fn audio_frame(bytes: Vec<u8>) -> FrameEnvelope {
        FrameEnvelope::new(Frame::Data(DataFrame::AudioRaw(AudioRaw::new(bytes, 16_000, 1, 2))))
    }

    fn control(c: ControlFrame) -> FrameEnvelope {
        FrameEnvelope::new(Frame::Control(c))
    }

    fn is_audio_raw(d: &DataFrame) -> bool {
        matches!(d, DataFrame::AudioRaw(_))
    }

    async fn drain_all(rx: &mut tokio::sync::mpsc::Receiver<(FrameEnvelope, Direction)>) -> Vec<FrameEnvelope> {
        let mut out = Vec::new();
        while let Ok(item) = rx.try_recv() {
            out.push(item.0);
        }
        out
    }

    #[tokio::test]
    async fn aggregates_between_start_and_end() {
        let (downstream_inlet, mut downstream_rx) = channel(8);
        let ctx = ProcessorContext::new(Some(downstream_inlet), None, None);
        let mut agg = AudioResponseAggregator::new(ControlFrame::TtsStarted, ControlFrame::TtsStopped, is_audio_raw);

        agg.process_frame(control(ControlFrame::TtsStarted), Direction::Downstream, &ctx).await;
        agg.process_frame(audio_frame(vec![1, 2]), Direction::Downstream, &ctx).await;
        agg.process_frame(audio_frame(vec![3, 4]), Direction::Downstream, &ctx).await;
        agg.process_frame(control(ControlFrame::TtsStopped), Direction::Downstream, &ctx).await;

        let out = drain_all(&mut downstream_rx).await;
        // TtsStarted, aggregated audio, TtsStopped.
        assert_eq!(out.len(), 3);
        match &out[1].payload {
            Frame::Data(DataFrame::AudioRaw(a)) => assert_eq!(a.bytes, vec![1, 2, 3, 4]),
            _ => panic!("expected aggregated audio frame"),
        }
    }

    #[tokio::test]
    async fn waits_for_interim_results_to_settle_before_flushing() {
        let (downstream_inlet, mut downstream_rx) = channel(8);
        let ctx = ProcessorContext::new(Some(downstream_inlet), None, None);
        let mut agg = AudioResponseAggregator::with_interim(
            ControlFrame::TtsStarted,
            ControlFrame::TtsStopped,
            is_audio_raw,
            |d| matches!(d, DataFrame::ThinkText(_)),
        );

        agg.process_frame(control(ControlFrame::TtsStarted), Direction::Downstream, &ctx).await;
        agg.process_frame(
            FrameEnvelope::new(Frame::Data(DataFrame::ThinkText(vox_frames::ThinkText {
                text: "...".into(),
            }))),
            Direction::Downstream,
            &ctx,
        )
        .await;
        agg.process_frame(control(ControlFrame::TtsStopped), Direction::Downstream, &ctx).await;
        // end arrived but interim results were seen, so no flush yet and
        // the aggregator keeps accepting audio.
        let out = drain_all(&mut downstream_rx).await;
        assert_eq!(out.len(), 2); // TtsStarted, TtsStopped only so far

        agg.process_frame(audio_frame(vec![9, 9]), Direction::Downstream, &ctx).await;
        let out = drain_all(&mut downstream_rx).await;
        assert_eq!(out.len(), 1);
        match &out[0].payload {
            Frame::Data(DataFrame::AudioRaw(a)) => assert_eq!(a.bytes, vec![9, 9]),
            _ => panic!("expected flushed aggregation"),
        }
    }

    #[tokio::test]
    async fn repeated_end_without_new_audio_does_not_resend() {
        let (downstream_inlet, mut downstream_rx) = channel(8);
        let ctx = ProcessorContext::new(Some(downstream_inlet), None, None);
        let mut agg = AudioResponseAggregator::new(ControlFrame::TtsStarted, ControlFrame::TtsStopped, is_audio_raw);

        agg.process_frame(control(ControlFrame::TtsStarted), Direction::Downstream, &ctx).await;
        agg.process_frame(audio_frame(vec![1, 2]), Direction::Downstream, &ctx).await;
        agg.process_frame(control(ControlFrame::TtsStopped), Direction::Downstream, &ctx).await;
        let _ = drain_all(&mut downstream_rx).await;

        // A second, stray end with nothing aggregated must not emit a
        // phantom frame (idempotence).
        agg.process_frame(control(ControlFrame::TtsStopped), Direction::Downstream, &ctx).await;
        let out = drain_all(&mut downstream_rx).await;
        assert_eq!(out.len(), 1); // just the forwarded TtsStopped control frame
        assert!(matches!(out[0].payload, Frame::Control(ControlFrame::TtsStopped)));
    }
}
