//! LLM turn orchestration (spec §4.7): provider abstraction, tool registry,
//! and the tool-call loop, wrapped as a pipeline processor.

pub mod orchestrator;
pub mod processor;
pub mod provider;
pub mod tool;

pub use orchestrator::{ChatMode, TurnEvent, TurnOrchestrator, MAX_TOOL_ROUNDS};
pub use processor::LlmProcessor;
pub use provider::{ChatDelta, LlmProvider, ToolCallDelta};
pub use tool::{Tool, ToolRegistry};
