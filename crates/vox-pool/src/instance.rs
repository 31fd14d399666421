use vox_foundation::error::VoxError;

/// A pooled resource (spec §4.10): a model-provider wrapper that can be
/// restored to a reusable state or permanently torn down.
pub trait PoolInstance: Send + 'static {
    /// Restores the instance to a reusable state before it goes back into
    /// the pool. A failure here is logged, not fatal — the instance is
    /// still returned (spec §4.10, §7).
    fn reset(&mut self) -> Result<(), VoxError>;

    /// Permanently destroys the instance (called on eviction and on pool
    /// close).
    fn release(self) -> Result<(), VoxError>;
}
