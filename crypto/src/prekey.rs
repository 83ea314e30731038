//! X25519 pre-key generation for asynchronous channel establishment.

use veil_types::{EncryptionPrivateKey, EncryptionPublicKey};
use x25519_dalek::{PublicKey, StaticSecret};

use crate::{CryptoError, EntropySource};

/// Generate a pre-key pair for the current device.
pub fn generate_pre_key_pair(
    entropy: &dyn EntropySource,
) -> Result<(EncryptionPrivateKey, EncryptionPublicKey), CryptoError> {
    let secret = StaticSecret::from(entropy.random_32()?);
    let public = PublicKey::from(&secret);
    Ok((
        EncryptionPrivateKey::X25519(secret.to_bytes()),
        EncryptionPublicKey::X25519(public.to_bytes()),
    ))
}

/// Recompute the public half of a stored pre-key.
pub fn pre_key_public_from_private(private: &EncryptionPrivateKey) -> EncryptionPublicKey {
    match private {
        EncryptionPrivateKey::X25519(bytes) => {
            let secret = StaticSecret::from(*bytes);
            EncryptionPublicKey::X25519(PublicKey::from(&secret).to_bytes())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::OsEntropy;

    #[test]
    fn public_half_is_consistent() {
        let (private, public) = generate_pre_key_pair(&OsEntropy).unwrap();
        assert_eq!(pre_key_public_from_private(&private), public);
    }

    #[test]
    fn fresh_pre_keys_differ() {
        let (_, a) = generate_pre_key_pair(&OsEntropy).unwrap();
        let (_, b) = generate_pre_key_pair(&OsEntropy).unwrap();
        assert_ne!(a, b);
    }
}
