use vox_frames::{AudioRaw, VadState, VadStateAudio};

use crate::provider::VoiceConfidenceProvider;

/// Tunables for [`VadAnalyzer`] (spec §4.3). `start_secs`/`stop_secs` are
/// rounded to the nearest whole analysis window, not truncated.
#[derive(Debug, Clone, Copy)]
pub struct VadAnalyzerConfig {
    pub sample_rate: u32,
    pub channels: u16,
    pub sample_width: u16,
    pub start_secs: f64,
    pub stop_secs: f64,
}

impl Default for VadAnalyzerConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16_000,
            channels: 1,
            sample_width: 2,
            start_secs: 0.032,
            stop_secs: 0.32,
        }
    }
}

/// The voice-activity segmentation state machine (spec §4.3). Consumes raw
/// audio in arbitrary-sized chunks, internally re-chunks it into fixed
/// analysis windows sized by the confidence provider, and emits one
/// [`VadStateAudio`] per whole window the chunk completes.
///
/// A chunk larger than one window drains every full window it completes
/// in the same call, in order, advancing the state machine once per
/// window — mirroring the reference ring-buffer loop (pop a window, run
/// the state machine, repeat while a full window remains buffered) rather
/// than capping at one window per call and letting the remainder lag
/// behind on a later call.
pub struct VadAnalyzer {
    config: VadAnalyzerConfig,
    provider: Box<dyn VoiceConfidenceProvider>,
    window_frames: usize,
    window_num_bytes: usize,
    sample_num_bytes: usize,
    start_frames: i64,
    stop_frames: i64,
    starting_count: i64,
    stopping_count: i64,
    state: VadState,
    buffer: Vec<u8>,
    speech_id: u64,
    processed_bytes: u64,
    is_final: bool,
    start_s: f64,
    cur_s: f64,
    end_s: f64,
}

impl VadAnalyzer {
    pub fn new(config: VadAnalyzerConfig, provider: Box<dyn VoiceConfidenceProvider>) -> Self {
        let (_, window_frames) = provider.sample_info();
        let window_num_bytes = window_frames * config.channels as usize * config.sample_width as usize;
        let sample_num_bytes = config.sample_rate as usize * config.channels as usize * config.sample_width as usize;
        let window_frames_per_sec = window_frames as f64 / config.sample_rate as f64;
        let start_frames = (config.start_secs / window_frames_per_sec).round() as i64;
        let stop_frames = (config.stop_secs / window_frames_per_sec).round() as i64;

        let mut analyzer = Self {
            config,
            provider,
            window_frames,
            window_num_bytes,
            sample_num_bytes,
            start_frames,
            stop_frames,
            starting_count: 0,
            stopping_count: 0,
            state: VadState::Quiet,
            buffer: Vec::new(),
            speech_id: 0,
            processed_bytes: 0,
            is_final: false,
            start_s: 0.0,
            cur_s: 0.0,
            end_s: 0.0,
        };
        analyzer.reset();
        analyzer
    }

    pub fn reset(&mut self) {
        self.starting_count = 0;
        self.stopping_count = 0;
        self.state = VadState::Quiet;
        self.speech_id = 0;
        self.processed_bytes = 0;
        self.is_final = false;
        self.start_s = 0.0;
        self.cur_s = 0.0;
        self.end_s = 0.0;
        self.buffer.clear();
    }

    pub fn state(&self) -> VadState {
        self.state
    }

    fn round_millis(value: f64) -> f64 {
        (value * 1000.0).round() / 1000.0
    }

    /// Feeds one chunk of raw audio and returns one state frame per whole
    /// analysis window the chunk completes (zero if it doesn't fill the
    /// buffer to a full window). A chunk spanning several windows drains
    /// and processes all of them here rather than leaving the rest
    /// buffered for a later call.
    pub fn analyze(&mut self, chunk: &[u8]) -> Vec<VadStateAudio> {
        self.buffer.extend_from_slice(chunk);

        let mut results = Vec::new();
        while self.buffer.len() >= self.window_num_bytes {
            let window: Vec<u8> = self.buffer.drain(..self.window_num_bytes).collect();
            results.push(self.process_window(window));
        }
        results
    }

    fn process_window(&mut self, window: Vec<u8>) -> VadStateAudio {
        self.cur_s = Self::round_millis(self.processed_bytes as f64 / self.sample_num_bytes as f64);
        let speaking = self.provider.is_active_speech(&window);

        if speaking {
            match self.state {
                VadState::Quiet => {
                    self.state = VadState::Starting;
                    self.starting_count = 1;
                }
                VadState::Starting => self.starting_count += 1,
                VadState::Stopping => {
                    self.state = VadState::Speaking;
                    self.stopping_count = 0;
                }
                VadState::Speaking => {}
            }
        } else {
            match self.state {
                VadState::Starting => {
                    self.state = VadState::Quiet;
                    self.starting_count = 0;
                    self.reset();
                }
                VadState::Speaking => {
                    self.state = VadState::Stopping;
                    self.stopping_count = 1;
                }
                VadState::Stopping => self.stopping_count += 1,
                VadState::Quiet => {}
            }
        }

        if self.state == VadState::Starting && self.starting_count >= self.start_frames {
            self.state = VadState::Speaking;
            self.starting_count = 0;
            self.speech_id += 1;
            self.is_final = false;
            self.start_s = self.cur_s;
            self.end_s = 0.0;
        }

        if self.state == VadState::Stopping && self.stopping_count >= self.stop_frames {
            self.state = VadState::Quiet;
            self.stopping_count = 0;
            self.is_final = true;
            self.end_s = Self::round_millis((self.processed_bytes + window.len() as u64) as f64 / self.sample_num_bytes as f64);
        }

        self.processed_bytes += window.len() as u64;
        self.snapshot(AudioRaw::new(window, self.config.sample_rate, self.config.channels, self.config.sample_width))
    }

    fn snapshot(&self, audio: AudioRaw) -> VadStateAudio {
        VadStateAudio {
            audio,
            state: self.state,
            speech_id: self.speech_id,
            is_final: self.is_final,
            start_s: self.start_s,
            cur_s: self.cur_s,
            end_s: self.end_s,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::VoiceConfidenceProvider;

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

    fn analyzer_with_script(script: Vec<bool>, start_secs: f64, stop_secs: f64) -> VadAnalyzer {
        let window = 160; // 10ms @ 16kHz mono16
        let provider = ScriptedProvider {
            window,
            script: script.into(),
        };
        let config = VadAnalyzerConfig {
            sample_rate: 16_000,
            channels: 1,
            sample_width: 2,
            start_secs,
            stop_secs,
        };
        VadAnalyzer::new(config, Box::new(provider))
    }

    fn window_bytes() -> Vec<u8> {
        vec![0u8; 160 * 2]
    }

    #[test]
    fn requires_consecutive_active_windows_to_start() {
        // start_secs = 20ms -> 2 windows of 10ms each required.
        let mut analyzer = analyzer_with_script(vec![true, true, true], 0.02, 0.32);
        let first = analyzer.analyze(&window_bytes());
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].state, VadState::Starting);
        let second = analyzer.analyze(&window_bytes());
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].state, VadState::Speaking);
        assert_eq!(second[0].speech_id, 1);
        assert!(!second[0].is_final);
    }

    #[test]
    fn false_start_resets_to_quiet() {
        let mut analyzer = analyzer_with_script(vec![true, false], 0.02, 0.32);
        let first = analyzer.analyze(&window_bytes());
        assert_eq!(first[0].state, VadState::Starting);
        let second = analyzer.analyze(&window_bytes());
        assert_eq!(second[0].state, VadState::Quiet);
        assert_eq!(second[0].speech_id, 0);
    }

    #[test]
    fn sustained_silence_after_speaking_marks_final() {
        // start_secs small, stop_secs = 20ms -> 2 quiet windows to stop.
        let mut analyzer = analyzer_with_script(vec![true, true, false, false], 0.01, 0.02);
        analyzer.analyze(&window_bytes()); // Starting
        analyzer.analyze(&window_bytes()); // Speaking (speech_id=1)
        let stopping = analyzer.analyze(&window_bytes());
        assert_eq!(stopping[0].state, VadState::Stopping);
        assert!(!stopping[0].is_final);
        let stopped = analyzer.analyze(&window_bytes());
        assert_eq!(stopped[0].state, VadState::Quiet);
        assert!(stopped[0].is_final);
        assert!(stopped[0].end_s > 0.0);
    }

    #[test]
    fn partial_window_is_buffered_without_advancing_state() {
        let mut analyzer = analyzer_with_script(vec![true], 0.01, 0.32);
        let partial = analyzer.analyze(&vec![0u8; 10]);
        assert!(partial.is_empty());
    }

    #[test]
    fn large_chunk_drains_every_full_window_in_one_call() {
        // A chunk spanning 3 windows (start_secs = 2 windows) must emit 3
        // results from a single call, not lag one window behind.
        let mut analyzer = analyzer_with_script(vec![true, true, true], 0.02, 0.32);
        let mut chunk = window_bytes();
        chunk.extend(window_bytes());
        chunk.extend(window_bytes());
        let results = analyzer.analyze(&chunk);
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].state, VadState::Starting);
        assert_eq!(results[1].state, VadState::Speaking);
        assert_eq!(results[2].state, VadState::Speaking);
    }
}
