use serde::{Deserialize, Serialize};

/// System-level frames (spec §3): privileged, bypass normal per-direction
/// ordering guarantees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SystemFrame {
    /// Interrupt the bot as if the user had interrupted, without emitting
    /// `UserStartedSpeaking`/`UserStoppedSpeaking`.
    BotInterruption,
}

impl SystemFrame {
    pub fn kind_name(&self) -> &'static str {
        match self {
            SystemFrame::BotInterruption => "BotInterruption",
        }
    }
}
