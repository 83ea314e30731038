//! Randomness used for uids, photo keys and pre-keys.

use veil_types::{Seed, SymmetricKey, Uid};

use crate::CryptoError;

/// Source of cryptographically secure random bytes.
pub trait EntropySource: Send + Sync {
    fn fill(&self, dest: &mut [u8]) -> Result<(), CryptoError>;

    fn random_32(&self) -> Result<[u8; 32], CryptoError> {
        let mut out = [0u8; 32];
        self.fill(&mut out)?;
        Ok(out)
    }

    fn random_uid(&self) -> Result<Uid, CryptoError> {
        Ok(Uid::new(self.random_32()?))
    }

    fn random_symmetric_key(&self) -> Result<SymmetricKey, CryptoError> {
        Ok(SymmetricKey::ChaCha20Poly1305(self.random_32()?))
    }

    fn random_seed(&self) -> Result<Seed, CryptoError> {
        Ok(Seed(self.random_32()?))
    }
}

/// The operating system RNG.
#[derive(Clone, Copy, Debug, Default)]
pub struct OsEntropy;

impl EntropySource for OsEntropy {
    fn fill(&self, dest: &mut [u8]) -> Result<(), CryptoError> {
        getrandom::getrandom(dest).map_err(|e| CryptoError::Entropy(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn os_entropy_produces_distinct_uids() {
        let a = OsEntropy.random_uid().unwrap();
        let b = OsEntropy.random_uid().unwrap();
        assert_ne!(a, b);
        assert!(!a.is_zero());
    }
}
