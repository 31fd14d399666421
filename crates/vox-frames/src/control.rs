use serde::{Deserialize, Serialize};

/// Control-frame payloads (spec §3). These carry no data of their own; they
/// signal lifecycle and turn-taking events between processors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControlFrame {
    Start,
    End,
    Cancel,
    StartInterruption,
    StopInterruption,
    UserStartedSpeaking,
    UserStoppedSpeaking,
    BotStartedSpeaking,
    BotStoppedSpeaking,
    BotSpeaking,
    TtsStarted,
    TtsStopped,
    TurnEnd,
}

impl ControlFrame {
    pub fn kind_name(&self) -> &'static str {
        match self {
            ControlFrame::Start => "Start",
            ControlFrame::End => "End",
            ControlFrame::Cancel => "Cancel",
            ControlFrame::StartInterruption => "StartInterruption",
            ControlFrame::StopInterruption => "StopInterruption",
            ControlFrame::UserStartedSpeaking => "UserStartedSpeaking",
            ControlFrame::UserStoppedSpeaking => "UserStoppedSpeaking",
            ControlFrame::BotStartedSpeaking => "BotStartedSpeaking",
            ControlFrame::BotStoppedSpeaking => "BotStoppedSpeaking",
            ControlFrame::BotSpeaking => "BotSpeaking",
            ControlFrame::TtsStarted => "TtsStarted",
            ControlFrame::TtsStopped => "TtsStopped",
            ControlFrame::TurnEnd => "TurnEnd",
        }
    }

    /// `End` and `Cancel` are terminal (spec §3 invariant b).
    pub fn is_terminal(&self) -> bool {
        matches!(self, ControlFrame::End | ControlFrame::Cancel)
    }
}
