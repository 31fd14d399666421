use vox_foundation::error::{TransportError, VoxError};
use vox_frames::Frame;

/// Pluggable wire codec for frames (spec §4.9/§6). A `prost`-based codec is
/// a documented extension point (see DESIGN.md); no `.proto` schema ships
/// with this implementation, so JSON is the only serializer provided.
pub trait FrameSerializer: Send + Sync {
    fn serialize(&self, frame: &Frame) -> Result<Vec<u8>, VoxError>;
    fn deserialize(&self, bytes: &[u8]) -> Result<Frame, VoxError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct JsonSerializer;

impl FrameSerializer for JsonSerializer {
    fn serialize(&self, frame: &Frame) -> Result<Vec<u8>, VoxError> {
        serde_json::to_vec(frame)
            .map_err(TransportError::from)
            .map_err(VoxError::from)
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<Frame, VoxError> {
        serde_json::from_slice(bytes)
            .map_err(TransportError::from)
            .map_err(VoxError::from)
    }
}

/// First-byte sniff used to pick the outbound message kind (spec §4.9):
/// payloads starting with `{` or `[` are sent as text, everything else as
/// binary.
pub fn looks_like_text(payload: &[u8]) -> bool {
    matches!(payload.first(), Some(b'{') | Some(b'['))
}

#[cfg(test)]
mod tests {
    use super::*;
    use vox_frames::{ControlFrame, DataFrame, Text};

    #[test]
    fn json_round_trips_a_frame() {
        let serializer = JsonSerializer;
        let frame = Frame::Data(DataFrame::Text(Text { utf8: "hi".into() }));
        let bytes = serializer.serialize(&frame).unwrap();
        assert!(looks_like_text(&bytes));
        let back = serializer.deserialize(&bytes).unwrap();
        assert_eq!(frame, back);
    }

    #[test]
    fn control_frame_round_trips_too() {
        let serializer = JsonSerializer;
        let frame = Frame::Control(ControlFrame::StartInterruption);
        let bytes = serializer.serialize(&frame).unwrap();
        let back = serializer.deserialize(&bytes).unwrap();
        assert_eq!(frame, back);
    }
}
