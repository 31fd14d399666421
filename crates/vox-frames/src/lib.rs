//! The frame model (spec §3, §4.1): the typed unit of exchange between
//! pipeline processors. `Frame` is a closed sum type over three categories —
//! no runtime-reflective dispatch (see REDESIGN FLAGS) — so stage code
//! switches on it exhaustively.

pub mod control;
pub mod data;
pub mod id;
pub mod system;

pub use control::ControlFrame;
pub use data::{
    AnimationAudio, AudioRaw, DataFrame, FunctionCall, ImageFormat, ImageMode, ImageRaw,
    PathAudio, Sprite, Text, ThinkText, TransportMessage, VadState, VadStateAudio,
};
pub use id::FrameId;
pub use system::SystemFrame;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Frame {
    Data(DataFrame),
    Control(ControlFrame),
    System(SystemFrame),
}

impl Frame {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Frame::Data(d) => d.kind_name(),
            Frame::Control(c) => c.kind_name(),
            Frame::System(s) => s.kind_name(),
        }
    }

    pub fn is_data(&self) -> bool {
        matches!(self, Frame::Data(_))
    }

    pub fn is_control(&self) -> bool {
        matches!(self, Frame::Control(_))
    }

    pub fn is_system(&self) -> bool {
        matches!(self, Frame::System(_))
    }

    pub fn as_control(&self) -> Option<ControlFrame> {
        match self {
            Frame::Control(c) => Some(*c),
            _ => None,
        }
    }

    pub fn as_data(&self) -> Option<&DataFrame> {
        match self {
            Frame::Data(d) => Some(d),
            _ => None,
        }
    }
}

impl From<DataFrame> for Frame {
    fn from(d: DataFrame) -> Self {
        Frame::Data(d)
    }
}

impl From<ControlFrame> for Frame {
    fn from(c: ControlFrame) -> Self {
        Frame::Control(c)
    }
}

impl From<SystemFrame> for Frame {
    fn from(s: SystemFrame) -> Self {
        Frame::System(s)
    }
}

/// A frame plus its process-wide identity (spec §4.1). Equality is by id,
/// never by payload — two envelopes wrapping identical payloads are
/// distinct frames.
#[derive(Debug, Clone)]
pub struct FrameEnvelope {
    pub id: FrameId,
    pub name: &'static str,
    pub payload: Frame,
}

impl FrameEnvelope {
    pub fn new(payload: Frame) -> Self {
        let name = payload.kind_name();
        Self {
            id: FrameId::next(),
            name,
            payload,
        }
    }
}

impl PartialEq for FrameEnvelope {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for FrameEnvelope {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelopes_compare_by_id_not_payload() {
        let a = FrameEnvelope::new(Frame::Control(ControlFrame::Start));
        let b = FrameEnvelope::new(Frame::Control(ControlFrame::Start));
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
    }

    #[test]
    fn control_terminal_classification() {
        assert!(ControlFrame::End.is_terminal());
        assert!(ControlFrame::Cancel.is_terminal());
        assert!(!ControlFrame::Start.is_terminal());
    }

    #[test]
    fn round_trip_json() {
        let frame = Frame::Data(DataFrame::Text(Text {
            utf8: "hello".into(),
        }));
        let json = serde_json::to_string(&frame).unwrap();
        let back: Frame = serde_json::from_str(&json).unwrap();
        assert_eq!(frame, back);
    }
}
