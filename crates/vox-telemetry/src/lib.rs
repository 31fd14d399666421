//! Shared, cross-task metrics for the pipeline runtime. Every field is an
//! atomic so stages on different tasks can update without a lock; cloning
//! the struct clones the `Arc` handles, not the counters.

use parking_lot::RwLock;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

#[derive(Clone)]
pub struct PipelineMetrics {
    pub frames_in: Arc<AtomicU64>,
    pub frames_out: Arc<AtomicU64>,
    pub frames_dropped: Arc<AtomicU64>,

    pub vad_speech_starts: Arc<AtomicU64>,
    pub vad_speech_stops: Arc<AtomicU64>,
    pub vad_current_speech_id: Arc<AtomicU64>,

    pub llm_tool_rounds: Arc<AtomicU64>,
    pub llm_tool_calls: Arc<AtomicU64>,
    pub llm_turns_completed: Arc<AtomicU64>,

    pub pool_created: Arc<AtomicU64>,
    pub pool_reused: Arc<AtomicU64>,
    pub pool_active: Arc<AtomicI64>,

    pub bot_speaking: Arc<AtomicU64>,
    pub interruptions: Arc<AtomicU64>,

    pub last_turn_at: Arc<RwLock<Option<Instant>>>,
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self {
            frames_in: Arc::new(AtomicU64::new(0)),
            frames_out: Arc::new(AtomicU64::new(0)),
            frames_dropped: Arc::new(AtomicU64::new(0)),
            vad_speech_starts: Arc::new(AtomicU64::new(0)),
            vad_speech_stops: Arc::new(AtomicU64::new(0)),
            vad_current_speech_id: Arc::new(AtomicU64::new(0)),
            llm_tool_rounds: Arc::new(AtomicU64::new(0)),
            llm_tool_calls: Arc::new(AtomicU64::new(0)),
            llm_turns_completed: Arc::new(AtomicU64::new(0)),
            pool_created: Arc::new(AtomicU64::new(0)),
            pool_reused: Arc::new(AtomicU64::new(0)),
            pool_active: Arc::new(AtomicI64::new(0)),
            bot_speaking: Arc::new(AtomicU64::new(0)),
            interruptions: Arc::new(AtomicU64::new(0)),
            last_turn_at: Arc::new(RwLock::new(None)),
        }
    }

    pub fn record_frame_in(&self) {
        self.frames_in.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_frame_out(&self) {
        self.frames_out.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_frame_dropped(&self) {
        self.frames_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_speech_start(&self, speech_id: u64) {
        self.vad_speech_starts.fetch_add(1, Ordering::Relaxed);
        self.vad_current_speech_id.store(speech_id, Ordering::Relaxed);
    }

    pub fn record_speech_stop(&self) {
        self.vad_speech_stops.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_turn_completed(&self) {
        self.llm_turns_completed.fetch_add(1, Ordering::Relaxed);
        *self.last_turn_at.write() = Some(Instant::now());
    }

    pub fn record_llm_call(&self) {
        self.llm_tool_calls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_tool_round(&self) {
        self.llm_tool_rounds.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_pool_created(&self) {
        self.pool_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_pool_reused(&self) {
        self.pool_reused.fetch_add(1, Ordering::Relaxed);
    }

    pub fn set_pool_active(&self, active: i64) {
        self.pool_active.store(active, Ordering::Relaxed);
    }

    pub fn record_bot_speaking(&self, speaking: bool) {
        self.bot_speaking.store(speaking as u64, Ordering::Relaxed);
    }

    pub fn record_interruption(&self) {
        self.interruptions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            frames_in: self.frames_in.load(Ordering::Relaxed),
            frames_out: self.frames_out.load(Ordering::Relaxed),
            frames_dropped: self.frames_dropped.load(Ordering::Relaxed),
            vad_speech_starts: self.vad_speech_starts.load(Ordering::Relaxed),
            vad_speech_stops: self.vad_speech_stops.load(Ordering::Relaxed),
            llm_turns_completed: self.llm_turns_completed.load(Ordering::Relaxed),
            pool_active: self.pool_active.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub frames_in: u64,
    pub frames_out: u64,
    pub frames_dropped: u64,
    pub vad_speech_starts: u64,
    pub vad_speech_stops: u64,
    pub llm_turns_completed: u64,
    pub pool_active: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_start_at_zero() {
        let m = PipelineMetrics::new();
        let snap = m.snapshot();
        assert_eq!(snap.frames_in, 0);
        assert_eq!(snap.pool_active, 0);
    }

    #[test]
    fn record_helpers_increment() {
        let m = PipelineMetrics::new();
        m.record_frame_in();
        m.record_speech_start(1);
        m.record_speech_stop();
        m.record_turn_completed();
        let snap = m.snapshot();
        assert_eq!(snap.frames_in, 1);
        assert_eq!(snap.vad_speech_starts, 1);
        assert_eq!(snap.vad_speech_stops, 1);
        assert_eq!(snap.llm_turns_completed, 1);
    }
}
