use async_trait::async_trait;
use vox_foundation::error::VoxError;

/// Wire-level message kind (spec §6: `kind ∈ {text=1, binary=2}`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Text,
    Binary,
}

/// The raw duplex endpoint a `Transport` writes framed payloads to. An
/// adapter (e.g. a WebSocket connection) implements this directly; `Transport`
/// owns the serialization, buffering, and single-writer mutex on top of it.
#[async_trait]
pub trait MessageSink: Send + Sync {
    async fn send(&self, kind: MessageKind, payload: Vec<u8>) -> Result<(), VoxError>;
}

/// The read half of the duplex endpoint. `recv` returns `None` once the
/// connection is closed.
#[async_trait]
pub trait MessageSource: Send {
    async fn recv(&mut self) -> Result<Option<(MessageKind, Vec<u8>)>, VoxError>;
}
