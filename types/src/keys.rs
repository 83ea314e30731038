//! Key material consumed by the engine as opaque value types.
//!
//! Every key family is a closed sum type decoded once, from a tagged byte
//! form, at the store or network boundary. Nothing deeper in the engine
//! re-interprets key bytes.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::{DecodeError, Identity};

/// A 32-byte Ed25519 private key (secret scalar seed).
///
/// This type intentionally does not implement `Debug`, `Serialize`, or `Clone`
/// to prevent accidental exposure. Key bytes are zeroized on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct PrivateKey(pub [u8; 32]);

/// An identity together with the private key it signs with.
pub struct KeyPair {
    pub public: Identity,
    pub private: PrivateKey,
}

/// A 64-byte Ed25519 signature.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Signature(pub [u8; 64]);

impl Signature {
    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }
}

impl Serialize for Signature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bytes(&self.0)
    }
}

impl<'de> Deserialize<'de> for Signature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct SigVisitor;

        impl<'de> serde::de::Visitor<'de> for SigVisitor {
            type Value = Signature;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, "64 bytes")
            }

            fn visit_bytes<E: serde::de::Error>(self, v: &[u8]) -> Result<Self::Value, E> {
                let arr: [u8; 64] = v
                    .try_into()
                    .map_err(|_| E::invalid_length(v.len(), &self))?;
                Ok(Signature(arr))
            }

            fn visit_seq<A: serde::de::SeqAccess<'de>>(
                self,
                mut seq: A,
            ) -> Result<Self::Value, A::Error> {
                let mut arr = [0u8; 64];
                for (i, byte) in arr.iter_mut().enumerate() {
                    *byte = seq
                        .next_element()?
                        .ok_or_else(|| serde::de::Error::invalid_length(i, &self))?;
                }
                Ok(Signature(arr))
            }
        }

        deserializer.deserialize_bytes(SigVisitor)
    }
}

fn split_tag(bytes: &[u8]) -> Result<(u8, [u8; 32]), DecodeError> {
    if bytes.len() != 33 {
        return Err(DecodeError::InvalidLength {
            expected: 33,
            actual: bytes.len(),
        });
    }
    let mut key = [0u8; 32];
    key.copy_from_slice(&bytes[1..]);
    Ok((bytes[0], key))
}

fn join_tag(tag: u8, key: &[u8; 32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(33);
    out.push(tag);
    out.extend_from_slice(key);
    out
}

/// Symmetric key protecting a photo or a group blob.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub enum SymmetricKey {
    ChaCha20Poly1305([u8; 32]),
    Aes256Gcm([u8; 32]),
}

impl SymmetricKey {
    const TAG_CHACHA: u8 = 0x00;
    const TAG_AES: u8 = 0x01;

    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Self::ChaCha20Poly1305(k) => join_tag(Self::TAG_CHACHA, k),
            Self::Aes256Gcm(k) => join_tag(Self::TAG_AES, k),
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DecodeError> {
        let (tag, key) = split_tag(bytes)?;
        match tag {
            Self::TAG_CHACHA => Ok(Self::ChaCha20Poly1305(key)),
            Self::TAG_AES => Ok(Self::Aes256Gcm(key)),
            other => Err(DecodeError::UnknownTag(other)),
        }
    }
}

impl fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ChaCha20Poly1305(_) => write!(f, "SymmetricKey::ChaCha20Poly1305(..)"),
            Self::Aes256Gcm(_) => write!(f, "SymmetricKey::Aes256Gcm(..)"),
        }
    }
}

/// Public half of a device pre-key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EncryptionPublicKey {
    X25519([u8; 32]),
}

impl EncryptionPublicKey {
    const TAG_X25519: u8 = 0x12;

    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Self::X25519(k) => join_tag(Self::TAG_X25519, k),
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DecodeError> {
        let (tag, key) = split_tag(bytes)?;
        match tag {
            Self::TAG_X25519 => Ok(Self::X25519(key)),
            other => Err(DecodeError::UnknownTag(other)),
        }
    }
}

/// Private half of a pre-key issued for the current owned device.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub enum EncryptionPrivateKey {
    X25519([u8; 32]),
}

impl fmt::Debug for EncryptionPrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EncryptionPrivateKey::X25519(..)")
    }
}

/// Private key a group administrator uses to authenticate blob uploads.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub enum ServerAuthPrivateKey {
    Ed25519([u8; 32]),
}

impl fmt::Debug for ServerAuthPrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ServerAuthPrivateKey::Ed25519(..)")
    }
}

/// A 32-byte secret seed: identity signing keys and group blob keys are
/// derived from one.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct Seed(pub [u8; 32]);

impl fmt::Debug for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Seed(..)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symmetric_key_tagged_roundtrip() {
        let key = SymmetricKey::Aes256Gcm([9u8; 32]);
        let bytes = key.to_bytes();
        assert_eq!(bytes[0], 0x01);
        assert_eq!(SymmetricKey::from_bytes(&bytes).unwrap(), key);
    }

    #[test]
    fn unknown_tag_is_rejected() {
        let mut bytes = vec![0x7f];
        bytes.extend_from_slice(&[0u8; 32]);
        assert_eq!(
            SymmetricKey::from_bytes(&bytes),
            Err(DecodeError::UnknownTag(0x7f))
        );
        assert_eq!(
            EncryptionPublicKey::from_bytes(&bytes),
            Err(DecodeError::UnknownTag(0x7f))
        );
    }

    #[test]
    fn debug_hides_key_bytes() {
        let key = SymmetricKey::ChaCha20Poly1305([0x42; 32]);
        assert!(!format!("{key:?}").contains("42"));
    }
}
