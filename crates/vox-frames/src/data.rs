use serde::{Deserialize, Serialize};

/// Raw linear-PCM audio. `num_frames` is sample-frames (not bytes): one
/// frame covers all channels for a single sample instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioRaw {
    pub bytes: Vec<u8>,
    pub sample_rate: u32,
    pub channels: u16,
    pub sample_width: u16,
    pub num_frames: u32,
}

impl AudioRaw {
    pub fn new(bytes: Vec<u8>, sample_rate: u32, channels: u16, sample_width: u16) -> Self {
        let per_frame = (channels as usize) * (sample_width as usize);
        let num_frames = if per_frame == 0 {
            0
        } else {
            (bytes.len() / per_frame) as u32
        };
        Self {
            bytes,
            sample_rate,
            channels,
            sample_width,
            num_frames,
        }
    }

    pub fn empty(sample_rate: u32, channels: u16, sample_width: u16) -> Self {
        Self::new(Vec::new(), sample_rate, channels, sample_width)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Text {
    pub utf8: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageMode {
    Rgb,
    Rgba,
    Gray,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageFormat {
    Png,
    Jpeg,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRaw {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub mode: ImageMode,
    pub format: ImageFormat,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sprite {
    pub images: Vec<ImageRaw>,
}

/// Voice-activity-detection state carried per-chunk through the pipeline
/// (spec §4.4). `end_s` is only meaningful once `is_final` is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VadState {
    Quiet,
    Starting,
    Speaking,
    Stopping,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VadStateAudio {
    pub audio: AudioRaw,
    pub state: VadState,
    pub speech_id: u64,
    pub is_final: bool,
    pub start_s: f64,
    pub cur_s: f64,
    pub end_s: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimationAudio {
    pub audio: AudioRaw,
    pub animation_json: String,
    pub avatar_status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathAudio {
    pub audio: AudioRaw,
    pub file_path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportMessage {
    pub payload_bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub tool_call_id: String,
    pub name: String,
    pub args: serde_json::Value,
    pub index: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThinkText {
    pub text: String,
}

/// Data-frame payloads (spec §3): frames that carry content downstream, as
/// opposed to control signals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DataFrame {
    AudioRaw(AudioRaw),
    Text(Text),
    ImageRaw(ImageRaw),
    Sprite(Sprite),
    VadStateAudio(VadStateAudio),
    AnimationAudio(AnimationAudio),
    PathAudio(PathAudio),
    TransportMessage(TransportMessage),
    FunctionCall(FunctionCall),
    ThinkText(ThinkText),
}

impl DataFrame {
    /// Audio bytes carried by this frame, for types the aggregator (C5)
    /// knows how to accumulate. Mirrors the Go aggregator's type switch over
    /// `*AudioRawFrame` / `*VADStateAudioRawFrame` / `*AnimationAudioRawFrame`.
    pub fn audio_bytes(&self) -> Option<&[u8]> {
        match self {
            DataFrame::AudioRaw(a) => Some(&a.bytes),
            DataFrame::VadStateAudio(v) => Some(&v.audio.bytes),
            DataFrame::AnimationAudio(a) => Some(&a.audio.bytes),
            DataFrame::PathAudio(p) => Some(&p.audio.bytes),
            _ => None,
        }
    }

    pub fn audio_meta(&self) -> Option<(u32, u16, u16)> {
        match self {
            DataFrame::AudioRaw(a) => Some((a.sample_rate, a.channels, a.sample_width)),
            DataFrame::VadStateAudio(v) => {
                Some((v.audio.sample_rate, v.audio.channels, v.audio.sample_width))
            }
            DataFrame::AnimationAudio(a) => {
                Some((a.audio.sample_rate, a.audio.channels, a.audio.sample_width))
            }
            DataFrame::PathAudio(p) => {
                Some((p.audio.sample_rate, p.audio.channels, p.audio.sample_width))
            }
            _ => None,
        }
    }

    /// Returns a copy of this frame with its embedded audio replaced by
    /// `bytes`, preserving the frame's own variant and sample format.
    /// Mirrors the Go aggregator's in-place `frame.Audio = ...` mutation,
    /// which keeps whatever concrete frame type was accumulating.
    pub fn with_audio_bytes(&self, bytes: Vec<u8>) -> Option<DataFrame> {
        match self {
            DataFrame::AudioRaw(a) => Some(DataFrame::AudioRaw(AudioRaw::new(
                bytes,
                a.sample_rate,
                a.channels,
                a.sample_width,
            ))),
            DataFrame::VadStateAudio(v) => {
                let mut v = v.clone();
                v.audio = AudioRaw::new(bytes, v.audio.sample_rate, v.audio.channels, v.audio.sample_width);
                Some(DataFrame::VadStateAudio(v))
            }
            DataFrame::AnimationAudio(a) => {
                let mut a = a.clone();
                a.audio = AudioRaw::new(bytes, a.audio.sample_rate, a.audio.channels, a.audio.sample_width);
                Some(DataFrame::AnimationAudio(a))
            }
            DataFrame::PathAudio(p) => {
                let mut p = p.clone();
                p.audio = AudioRaw::new(bytes, p.audio.sample_rate, p.audio.channels, p.audio.sample_width);
                Some(DataFrame::PathAudio(p))
            }
            _ => None,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            DataFrame::AudioRaw(_) => "AudioRaw",
            DataFrame::Text(_) => "Text",
            DataFrame::ImageRaw(_) => "ImageRaw",
            DataFrame::Sprite(_) => "Sprite",
            DataFrame::VadStateAudio(_) => "VadStateAudio",
            DataFrame::AnimationAudio(_) => "AnimationAudio",
            DataFrame::PathAudio(_) => "PathAudio",
            DataFrame::TransportMessage(_) => "TransportMessage",
            DataFrame::FunctionCall(_) => "FunctionCall",
            DataFrame::ThinkText(_) => "ThinkText",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn num_frames_computed_from_bytes() {
        let a = AudioRaw::new(vec![0u8; 8], 16_000, 1, 2);
        assert_eq!(a.num_frames, 4);
    }

    #[test]
    fn audio_bytes_extracted_across_composites() {
        let vad = DataFrame::VadStateAudio(VadStateAudio {
            audio: AudioRaw::new(vec![1, 2, 3, 4], 16_000, 1, 2),
            state: VadState::Speaking,
            speech_id: 1,
            is_final: false,
            start_s: 0.0,
            cur_s: 0.0,
            end_s: 0.0,
        });
        assert_eq!(vad.audio_bytes(), Some([1u8, 2, 3, 4].as_slice()));
    }

    #[test]
    fn with_audio_bytes_preserves_variant() {
        let vad = DataFrame::VadStateAudio(VadStateAudio {
            audio: AudioRaw::new(vec![1, 2], 16_000, 1, 2),
            state: VadState::Speaking,
            speech_id: 1,
            is_final: false,
            start_s: 0.0,
            cur_s: 0.0,
            end_s: 0.0,
        });
        let replaced = vad.with_audio_bytes(vec![9, 9, 9, 9]).unwrap();
        assert!(matches!(replaced, DataFrame::VadStateAudio(_)));
        assert_eq!(replaced.audio_bytes(), Some([9u8, 9, 9, 9].as_slice()));
    }
}
