//! Group identifiers for legacy (V1) and server-backed (V2) groups.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{DecodeError, Identity, Uid};

/// Primary key of a legacy group: the owner's identity plus a uid the owner
/// chose when creating it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GroupV1Id {
    pub uid: Uid,
    pub owner: Identity,
}

impl GroupV1Id {
    pub fn new(uid: Uid, owner: Identity) -> Self {
        Self { uid, owner }
    }

    /// Concatenated `owner || uid`, the form a group is referenced by in
    /// trust origins and on the wire.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(64);
        out.extend_from_slice(self.owner.as_bytes());
        out.extend_from_slice(self.uid.as_bytes());
        out
    }
}

/// Who owns a legacy group from the point of view of one owned identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GroupOwner {
    Me,
    Contact(Identity),
}

impl GroupOwner {
    pub fn is_me(&self) -> bool {
        matches!(self, GroupOwner::Me)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum GroupV2Category {
    /// Membership is driven by a server blob guarded by an administrators chain.
    Server,
    /// Membership is driven by an identity server; no administrators chain.
    Keycloak,
}

impl GroupV2Category {
    pub fn as_byte(&self) -> u8 {
        match self {
            GroupV2Category::Server => 0,
            GroupV2Category::Keycloak => 1,
        }
    }

    pub fn from_byte(b: u8) -> Result<Self, DecodeError> {
        match b {
            0 => Ok(GroupV2Category::Server),
            1 => Ok(GroupV2Category::Keycloak),
            other => Err(DecodeError::InvalidCategory(other)),
        }
    }
}

/// Primary key of a Group-V2 instance.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GroupV2Identifier {
    pub group_uid: Uid,
    pub server_url: String,
    pub category: GroupV2Category,
}

impl GroupV2Identifier {
    pub fn new(group_uid: Uid, server_url: impl Into<String>, category: GroupV2Category) -> Self {
        Self {
            group_uid,
            server_url: server_url.into(),
            category,
        }
    }

    pub fn is_keycloak(&self) -> bool {
        self.category == GroupV2Category::Keycloak
    }

    /// `category || uid || server_url`, used when a group is referenced from
    /// another record (a trust origin for instance).
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(33 + self.server_url.len());
        out.push(self.category.as_byte());
        out.extend_from_slice(self.group_uid.as_bytes());
        out.extend_from_slice(self.server_url.as_bytes());
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DecodeError> {
        if bytes.len() < 33 {
            return Err(DecodeError::InvalidLength {
                expected: 33,
                actual: bytes.len(),
            });
        }
        let category = GroupV2Category::from_byte(bytes[0])?;
        let group_uid = Uid::from_slice(&bytes[1..33])?;
        let server_url = String::from_utf8_lossy(&bytes[33..]).into_owned();
        Ok(Self {
            group_uid,
            server_url,
            category,
        })
    }
}

impl fmt::Display for GroupV2Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}:{}@{}", self.category, self.group_uid, self.server_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifier_bytes_roundtrip() {
        let id = GroupV2Identifier::new(
            Uid::new([3u8; 32]),
            "https://server.example",
            GroupV2Category::Keycloak,
        );
        assert_eq!(GroupV2Identifier::from_bytes(&id.to_bytes()).unwrap(), id);
    }

    #[test]
    fn identifier_rejects_unknown_category() {
        let mut bytes = vec![9u8];
        bytes.extend_from_slice(&[0u8; 32]);
        assert_eq!(
            GroupV2Identifier::from_bytes(&bytes),
            Err(DecodeError::InvalidCategory(9))
        );
    }
}
