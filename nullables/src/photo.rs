//! Nullable photo store: keeps photo bytes in memory.

use std::collections::BTreeMap;
use std::sync::Mutex;

use veil_store::{PhotoStore, StoreError};

/// In-memory photo files, named `photo-<n>` in write order.
#[derive(Debug, Default)]
pub struct NullPhotoStore {
    files: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl NullPhotoStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes previously written under `reference`.
    pub fn read(&self, reference: &str) -> Option<Vec<u8>> {
        self.files.lock().ok()?.get(reference).cloned()
    }

    pub fn file_count(&self) -> usize {
        self.files.lock().map(|f| f.len()).unwrap_or(0)
    }
}

impl PhotoStore for NullPhotoStore {
    fn write(&self, bytes: &[u8]) -> Result<String, StoreError> {
        let mut files = self
            .files
            .lock()
            .map_err(|_| StoreError::Backend("photo store lock poisoned".into()))?;
        let reference = format!("photo-{}", files.len());
        files.insert(reference.clone(), bytes.to_vec());
        Ok(reference)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_are_readable_under_returned_reference() {
        let photos = NullPhotoStore::new();
        let first = photos.write(b"jpeg").unwrap();
        let second = photos.write(b"png").unwrap();
        assert_ne!(first, second);
        assert_eq!(photos.read(&first).unwrap(), b"jpeg");
        assert_eq!(photos.file_count(), 2);
    }
}
