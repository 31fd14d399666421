use async_trait::async_trait;
use vox_foundation::error::VoxError;
use vox_frames::Frame;

/// The terminal sink the output stage writes to (spec §6 `ITransportWriter`).
/// Implemented by the transport adapter (C9); kept as a local trait here so
/// this crate doesn't need to depend on the transport crate.
#[async_trait]
pub trait TransportWriter: Send + Sync {
    /// Accumulates raw PCM bytes for the next outbound audio frame.
    async fn write_raw_audio(&self, bytes: &[u8]) -> Result<(), VoxError>;

    /// Serializes and sends a non-audio frame directly (text, images,
    /// interruption signals).
    async fn write_frame(&self, frame: &Frame) -> Result<(), VoxError>;
}
