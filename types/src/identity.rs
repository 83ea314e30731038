//! Public identity of a user: the 32-byte Ed25519 key they sign with.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::DecodeError;

/// An opaque, comparable public identifier for an owned identity or a contact.
///
/// The bytes are the Ed25519 verifying key of the identity, so signatures
/// produced by the holder (administrator chain blocks, for instance) can be
/// checked against it directly.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Identity([u8; 32]);

impl Identity {
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, DecodeError> {
        let arr: [u8; 32] = bytes.try_into().map_err(|_| DecodeError::InvalidLength {
            expected: 32,
            actual: bytes.len(),
        })?;
        Ok(Self(arr))
    }

    pub fn from_hex(s: &str) -> Result<Self, DecodeError> {
        let bytes = hex::decode(s).map_err(|e| DecodeError::InvalidHex(e.to_string()))?;
        Self::from_slice(&bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identity({})", hex::encode(&self.0[..4]))
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_roundtrip() {
        let id = Identity::new([7u8; 32]);
        assert_eq!(Identity::from_hex(&id.to_hex()).unwrap(), id);
    }

    #[test]
    fn from_slice_rejects_short_input() {
        assert_eq!(
            Identity::from_slice(&[1, 2, 3]),
            Err(DecodeError::InvalidLength {
                expected: 32,
                actual: 3
            })
        );
    }

    #[test]
    fn debug_is_abbreviated() {
        let id = Identity::new([0xab; 32]);
        assert_eq!(format!("{id:?}"), "Identity(abababab)");
    }
}
