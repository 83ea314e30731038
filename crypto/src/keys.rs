//! Ed25519 identity key generation.

use ed25519_dalek::SigningKey;
use veil_types::{Identity, KeyPair, PrivateKey};

use crate::{CryptoError, EntropySource};

/// Generate a fresh identity key pair.
pub fn generate_keypair(entropy: &dyn EntropySource) -> Result<KeyPair, CryptoError> {
    let seed = entropy.random_32()?;
    Ok(keypair_from_seed(&seed))
}

/// Derive the identity from a private key.
pub fn public_from_private(private: &PrivateKey) -> Identity {
    let signing_key = SigningKey::from_bytes(&private.0);
    Identity::new(signing_key.verifying_key().to_bytes())
}

/// Derive a key pair from a 32-byte seed (deterministic).
pub fn keypair_from_seed(seed: &[u8; 32]) -> KeyPair {
    let signing_key = SigningKey::from_bytes(seed);
    KeyPair {
        public: Identity::new(signing_key.verifying_key().to_bytes()),
        private: PrivateKey(signing_key.to_bytes()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::OsEntropy;

    #[test]
    fn public_from_private_is_deterministic() {
        let kp = generate_keypair(&OsEntropy).unwrap();
        assert_eq!(public_from_private(&kp.private), kp.public);
    }

    #[test]
    fn keypair_from_seed_deterministic() {
        let kp1 = keypair_from_seed(&[42u8; 32]);
        let kp2 = keypair_from_seed(&[42u8; 32]);
        assert_eq!(kp1.public, kp2.public);
        assert_eq!(kp1.private.0, kp2.private.0);
    }

    #[test]
    fn different_seeds_produce_different_identities() {
        assert_ne!(
            keypair_from_seed(&[1u8; 32]).public,
            keypair_from_seed(&[2u8; 32]).public
        );
    }
}
