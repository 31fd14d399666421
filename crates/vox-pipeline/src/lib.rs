//! Processor runtime and pipeline composer (spec §4): a linear chain of
//! [`Processor`] stages, each either inline-synchronous or worker-backed,
//! wired downstream/upstream with bounded queues.

pub mod context;
pub mod direction;
pub mod pipeline;
pub mod processor;

pub use context::{Inlet, ProcessorContext, DEFAULT_QUEUE_CAPACITY};
pub use direction::Direction;
pub use pipeline::{Pipeline, StageKind};
pub use processor::Processor;
