/// A pluggable speech/no-speech classifier. Real deployments back this with
/// an ONNX model; the analyzer only needs the window size it consumes and a
/// per-window speech verdict.
pub trait VoiceConfidenceProvider: Send {
    /// Sample rate the provider was built for, and the window size (in
    /// frames) it expects per `is_active_speech` call.
    fn sample_info(&self) -> (u32, usize);

    /// Classifies exactly `sample_info().1` frames worth of audio.
    fn is_active_speech(&mut self, audio: &[u8]) -> bool;
}

/// A dependency-free provider for tests and local development: speech is
/// "active" when the mean absolute sample amplitude over the window clears
/// a fixed threshold. Not a substitute for a trained model; it exists so
/// the analyzer and pipeline wiring can run without one.
pub struct EnergyThresholdProvider {
    sample_rate: u32,
    window_frames: usize,
    threshold: f32,
}

impl EnergyThresholdProvider {
    pub fn new(sample_rate: u32, window_frames: usize, threshold: f32) -> Self {
        Self {
            sample_rate,
            window_frames,
            threshold,
        }
    }
}

impl Default for EnergyThresholdProvider {
    fn default() -> Self {
        // 512-frame windows at 16kHz mirror the reference 32ms analysis
        // window used by real speech-confidence models.
        Self::new(16_000, 512, 0.02)
    }
}

impl VoiceConfidenceProvider for EnergyThresholdProvider {
    fn sample_info(&self) -> (u32, usize) {
        (self.sample_rate, self.window_frames)
    }

    fn is_active_speech(&mut self, audio: &[u8]) -> bool {
        if audio.len() < 2 {
            return false;
        }
        let mut sum = 0i64;
        let mut count = 0i64;
        for chunk in audio.chunks_exact(2) {
            let sample = i16::from_le_bytes([chunk[0], chunk[1]]);
            sum += sample.unsigned_abs() as i64;
            count += 1;
        }
        if count == 0 {
            return false;
        }
        let mean = sum as f32 / count as f32 / i16::MAX as f32;
        mean >= self.threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn silence(frames: usize) -> Vec<u8> {
        vec![0u8; frames * 2]
    }

    fn tone(frames: usize, amplitude: i16) -> Vec<u8> {
        let mut out = Vec::with_capacity(frames * 2);
        for _ in 0..frames {
            out.extend_from_slice(&amplitude.to_le_bytes());
        }
        out
    }

    #[test]
    fn silence_is_not_active() {
        let mut p = EnergyThresholdProvider::default();
        assert!(!p.is_active_speech(&silence(512)));
    }

    #[test]
    fn loud_tone_is_active() {
        let mut p = EnergyThresholdProvider::default();
        assert!(p.is_active_speech(&tone(512, 5000)));
    }
}
