use serde::{Deserialize, Serialize};
use veil_types::{EncryptionPublicKey, Timestamp, Uid};

/// A device's published pre-key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreKey {
    pub key_id: Uid,
    pub encryption_public_key: EncryptionPublicKey,
    pub expiration: Timestamp,
}

impl PreKey {
    pub fn is_expired(&self, cutoff: Timestamp) -> bool {
        self.expiration < cutoff
    }
}

/// What [`set_pre_key`](crate::set_pre_key) did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PreKeyChange {
    Added,
    Removed,
    /// One pre-key swapped for a different one; availability did not change.
    Replaced,
    Unchanged,
}

impl PreKeyChange {
    pub fn between(old: Option<&PreKey>, new: Option<&PreKey>) -> Self {
        match (old, new) {
            (None, None) => Self::Unchanged,
            (None, Some(_)) => Self::Added,
            (Some(_), None) => Self::Removed,
            (Some(a), Some(b)) if a == b => Self::Unchanged,
            (Some(_), Some(_)) => Self::Replaced,
        }
    }

    /// Only presence transitions are worth telling anyone about.
    pub fn changes_availability(self) -> bool {
        matches!(self, Self::Added | Self::Removed)
    }
}
