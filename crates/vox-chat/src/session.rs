use serde_json::Value;

use crate::history::ChatHistory;

/// Per-connection conversational state: a turn counter, an opaque session
/// identifier, and the bounded chat history (spec §4.6).
pub struct Session {
    chat_round: u64,
    session_id: String,
    chat_history: ChatHistory,
}

impl Session {
    pub fn new(session_id: impl Into<String>, chat_history_size: Option<i64>) -> Self {
        Self {
            chat_round: 0,
            session_id: session_id.into(),
            chat_history: ChatHistory::new(chat_history_size, None, None),
        }
    }

    pub fn init_chat_message(&mut self, message: Value) {
        self.chat_history.init(Some(message));
    }

    /// Clears the chat round and history, including the init message, so
    /// the next turn starts from a clean slate.
    pub fn reset(&mut self) {
        self.chat_round = 0;
        self.chat_history.clear();
        self.chat_history.init(None);
    }

    pub fn set_chat_history_size(&mut self, size: Option<i64>) {
        self.chat_history.set_size(size);
    }

    pub fn set_session_id(&mut self, session_id: impl Into<String>) {
        self.session_id = session_id.into();
    }

    pub fn increment_chat_round(&mut self) {
        self.chat_round += 1;
    }

    pub fn chat_round(&self) -> u64 {
        self.chat_round
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn chat_history(&self) -> &ChatHistory {
        &self.chat_history
    }

    pub fn chat_history_mut(&mut self) -> &mut ChatHistory {
        &mut self.chat_history
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reset_clears_round_history_and_init_message() {
        let mut s = Session::new("sess-1", None);
        s.init_chat_message(json!({"role": "system"}));
        s.chat_history_mut().append(json!({"role": "user", "content": "hi"}));
        s.increment_chat_round();
        assert_eq!(s.chat_round(), 1);

        s.reset();
        assert_eq!(s.chat_round(), 0);
        assert!(s.chat_history().to_list().is_empty());
    }

    #[test]
    fn session_id_is_mutable() {
        let mut s = Session::new("sess-1", None);
        assert_eq!(s.session_id(), "sess-1");
        s.set_session_id("sess-2");
        assert_eq!(s.session_id(), "sess-2");
    }
}
