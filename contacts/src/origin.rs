use serde::{Deserialize, Serialize};
use veil_store::{KeyBuilder, Record, Table};
use veil_types::{GroupV2Identifier, Identity, Timestamp, TrustLevel};

/// Why a contact is trusted.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrustOriginKind {
    /// Keys exchanged in person or over an authenticated channel.
    Direct,
    /// Introduced by another contact.
    Introduction { mediator: Identity },
    /// Met through a group; the group owner vouched for the member.
    Group { group_owner: Identity },
    /// Certified by an identity server.
    IdentityServer { server: String },
    /// Member of a server-managed group.
    ServerGroupV2 { group: GroupV2Identifier },
}

impl TrustOriginKind {
    /// The identity whose own trust level this origin derives from.
    pub fn mediator(&self) -> Option<&Identity> {
        match self {
            Self::Introduction { mediator } => Some(mediator),
            Self::Group { group_owner } => Some(group_owner),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustOrigin {
    pub timestamp: Timestamp,
    pub kind: TrustOriginKind,
}

impl TrustOrigin {
    pub fn new(timestamp: Timestamp, kind: TrustOriginKind) -> Self {
        Self { timestamp, kind }
    }

    pub fn direct(timestamp: Timestamp) -> Self {
        Self::new(timestamp, TrustOriginKind::Direct)
    }
}

/// A recorded origin with the level it contributed when it was recorded.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustOriginRow {
    pub owned: Identity,
    pub contact: Identity,
    pub seq: u64,
    pub origin: TrustOrigin,
    pub level: TrustLevel,
}

impl Record for TrustOriginRow {
    const TABLE: Table = Table::ContactTrustOrigin;

    fn key(&self) -> Vec<u8> {
        KeyBuilder::new()
            .identity(&self.owned)
            .identity(&self.contact)
            .u64(self.seq)
            .build()
    }
}
