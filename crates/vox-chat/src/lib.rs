//! Bounded chat history and session state (spec §4.6).

pub mod history;
pub mod session;

pub use history::ChatHistory;
pub use session::Session;
