use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A size-bounded rolling buffer of chat turns, kept small enough that the
/// LLM's context window doesn't grow unbounded over a long session (spec
/// §4.6).
///
/// `size` semantics:
/// - `None`: unlimited history.
/// - `Some(n)` with `n < 0`: no history is kept at all (append/pop are
///   no-ops); useful for stateless single-turn modes.
/// - `Some(n)` with `n >= 0`: keeps at most `2*(n+1)` buffered turns, since
///   each conversational step contributes a prompt and an answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatHistory {
    size: Option<i64>,
    #[serde(rename = "init_chat_message")]
    init_chat_message: Option<Value>,
    #[serde(rename = "init_chat_tools")]
    init_chat_tools: Option<Value>,
    buffer: Vec<Value>,
}

impl ChatHistory {
    pub fn new(size: Option<i64>, init_chat_message: Option<Value>, init_chat_tools: Option<Value>) -> Self {
        Self {
            size,
            init_chat_message,
            init_chat_tools,
            buffer: Vec::new(),
        }
    }

    pub fn set_size(&mut self, size: Option<i64>) {
        self.size = size;
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    fn history_disabled(&self) -> bool {
        matches!(self.size, Some(n) if n < 0)
    }

    /// Appends one turn, trimming the oldest pair once the buffer reaches
    /// `2*(size+1)` entries.
    pub fn append(&mut self, item: Value) {
        if self.history_disabled() {
            return;
        }
        self.buffer.push(item);
        let Some(size) = self.size else { return };
        let limit = 2 * (size + 1);
        if self.buffer.len() as i64 == limit {
            self.buffer.drain(0..2);
        }
    }

    /// Removes the entry at `index`; negative indices count from the end,
    /// Python-slice style. Out-of-range indices are ignored.
    pub fn pop(&mut self, index: i64) {
        if self.history_disabled() || self.buffer.is_empty() {
            return;
        }
        let resolved = if index < 0 {
            self.buffer.len() as i64 + index
        } else {
            index
        };
        if resolved >= 0 && (resolved as usize) < self.buffer.len() {
            self.buffer.remove(resolved as usize);
        }
    }

    pub fn init(&mut self, init_chat_message: Option<Value>) {
        self.init_chat_message = init_chat_message;
    }

    pub fn tools(&self) -> Option<&Value> {
        self.init_chat_tools.as_ref()
    }

    pub fn init_tools(&mut self, tools: Option<Value>) {
        self.init_chat_tools = tools;
    }

    /// The buffered turns plus the init message, but never the tools
    /// message — used when building a prompt for a provider call that
    /// carries tool schemas out-of-band.
    pub fn to_list_without_tools(&self) -> Vec<Value> {
        let mut out = Vec::with_capacity(self.buffer.len() + 1);
        if let Some(msg) = &self.init_chat_message {
            out.push(msg.clone());
        }
        out.extend(self.buffer.iter().cloned());
        out
    }

    /// The full prompt: init message, then init tools message (if any),
    /// then the buffered turns.
    pub fn to_list(&self) -> Vec<Value> {
        let mut out = Vec::with_capacity(self.buffer.len() + 2);
        if let Some(msg) = &self.init_chat_message {
            out.push(msg.clone());
            if let Some(tools) = &self.init_chat_tools {
                out.push(tools.clone());
            }
        }
        out.extend(self.buffer.iter().cloned());
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn turn(role: &str, n: usize) -> Value {
        json!({ "role": role, "n": n })
    }

    #[test]
    fn unlimited_history_keeps_everything() {
        let mut h = ChatHistory::new(None, None, None);
        for i in 0..10 {
            h.append(turn("user", i));
        }
        assert_eq!(h.to_list().len(), 10);
    }

    #[test]
    fn negative_size_disables_history() {
        let mut h = ChatHistory::new(Some(-1), None, None);
        h.append(turn("user", 0));
        h.pop(0);
        assert!(h.to_list().is_empty());
    }

    #[test]
    fn bounded_size_trims_oldest_pair() {
        // size = 1 -> keep at most 2*(1+1) = 4 entries.
        let mut h = ChatHistory::new(Some(1), None, None);
        for i in 0..6 {
            h.append(turn("user", i));
        }
        let list = h.to_list();
        assert_eq!(list.len(), 4);
        assert_eq!(list[0]["n"], 2);
        assert_eq!(list[3]["n"], 5);
    }

    #[test]
    fn negative_index_pop_counts_from_end() {
        let mut h = ChatHistory::new(None, None, None);
        h.append(turn("user", 0));
        h.append(turn("assistant", 1));
        h.append(turn("user", 2));
        h.pop(-1);
        let list = h.to_list();
        assert_eq!(list.len(), 2);
        assert_eq!(list[1]["n"], 1);
    }

    #[test]
    fn to_list_includes_init_message_and_tools_to_list_without_tools_omits_tools() {
        let mut h = ChatHistory::new(None, Some(json!({"role": "system"})), Some(json!({"tools": []})));
        h.append(turn("user", 0));
        assert_eq!(h.to_list().len(), 3);
        assert_eq!(h.to_list_without_tools().len(), 2);
    }

    #[test]
    fn json_round_trip_preserves_state() {
        let mut h = ChatHistory::new(Some(2), Some(json!({"role": "system"})), None);
        h.append(turn("user", 0));
        let encoded = serde_json::to_string(&h).unwrap();
        let decoded: ChatHistory = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded.to_list(), h.to_list());
    }
}
