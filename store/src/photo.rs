//! Byte store for downloaded photos.

use crate::StoreError;

/// Persists photo bytes and hands back a stable local reference.
///
/// Every call returns a fresh reference, so two downloads of the same
/// photo never collide. Reading photos back is not needed by the engine.
pub trait PhotoStore: Send + Sync {
    fn write(&self, bytes: &[u8]) -> Result<String, StoreError>;
}
