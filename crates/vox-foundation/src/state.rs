use parking_lot::RwLock;
use std::sync::Arc;

use crate::error::VoxError;

/// Coarse-grained lifecycle state for a pipeline session, used by health
/// reporting and shutdown coordination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Initializing,
    Running,
    Draining,
    Cancelled,
    Stopped,
}

pub struct SessionStateMachine {
    state: Arc<RwLock<SessionState>>,
}

impl Default for SessionStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStateMachine {
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(SessionState::Initializing)),
        }
    }

    pub fn transition(&self, new_state: SessionState) -> Result<(), VoxError> {
        let mut current = self.state.write();
        let valid = matches!(
            (&*current, &new_state),
            (SessionState::Initializing, SessionState::Running)
                | (SessionState::Running, SessionState::Draining)
                | (SessionState::Running, SessionState::Cancelled)
                | (SessionState::Draining, SessionState::Stopped)
                | (SessionState::Draining, SessionState::Cancelled)
                | (SessionState::Cancelled, SessionState::Stopped)
        );

        if !valid {
            return Err(VoxError::Fatal(format!(
                "invalid session state transition: {:?} -> {:?}",
                *current, new_state
            )));
        }

        tracing::debug!(from = ?*current, to = ?new_state, "session state transition");
        *current = new_state;
        Ok(())
    }

    pub fn current(&self) -> SessionState {
        self.state.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_invalid_transition() {
        let sm = SessionStateMachine::new();
        assert!(sm.transition(SessionState::Stopped).is_err());
        assert!(sm.transition(SessionState::Running).is_ok());
        assert_eq!(sm.current(), SessionState::Running);
    }
}
