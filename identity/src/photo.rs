//! Downloaded photos kept as files.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;
use veil_crypto::EntropySource;
use veil_store::{PhotoStore, StoreError};

use crate::IdentityError;

/// Writes each photo to its own file, named after a fresh random uid.
pub struct FsPhotoStore {
    dir: PathBuf,
    entropy: Arc<dyn EntropySource>,
}

impl FsPhotoStore {
    /// Open (creating if needed) the photo directory.
    pub fn open(dir: &Path, entropy: Arc<dyn EntropySource>) -> Result<Self, IdentityError> {
        std::fs::create_dir_all(dir)
            .map_err(|e| IdentityError::Config(format!("photo directory {}: {e}", dir.display())))?;
        Ok(Self {
            dir: dir.to_path_buf(),
            entropy,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl PhotoStore for FsPhotoStore {
    fn write(&self, bytes: &[u8]) -> Result<String, StoreError> {
        let name = self
            .entropy
            .random_uid()
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        let path = self.dir.join(name.to_string());
        std::fs::write(&path, bytes).map_err(|e| StoreError::Backend(e.to_string()))?;
        debug!(path = %path.display(), len = bytes.len(), "photo written");
        Ok(path.to_string_lossy().into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use veil_nullables::NullEntropy;

    #[test]
    fn every_write_gets_its_own_file() {
        let dir = tempfile::tempdir().unwrap();
        let photos = FsPhotoStore::open(&dir.path().join("photos"), Arc::new(NullEntropy::counting()))
            .unwrap();

        let first = photos.write(b"jpeg").unwrap();
        let second = photos.write(b"jpeg").unwrap();

        assert_ne!(first, second);
        assert_eq!(std::fs::read(&first).unwrap(), b"jpeg");
        assert!(Path::new(&second).starts_with(photos.dir()));
    }
}
