use crate::error::Result;

/// Core compression abstraction.
///
/// Each `Codec` implementation:
/// - Must compress/decompress individual blocks independently; no cross-block
///   state is permitted. This is the invariant that makes random access possible.
/// - Is stateless after construction, so one instance is shared read-only by
///   every worker of an engine or reader (`Arc<dyn Codec>`).
pub trait Codec: Send + Sync {
    /// Human-readable codec name for logs and CLI display.
    fn name(&self) -> &'static str;

    /// Compress a single independent block. The raw length is `raw.len()`.
    fn compress_block(&self, raw: &[u8]) -> Result<Vec<u8>>;

    /// Decompress a single independent block produced by `compress_block`.
    fn decompress_block(&self, compressed: &[u8]) -> Result<Vec<u8>>;
}
