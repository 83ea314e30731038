//! Change events accumulated during a transaction and delivered after commit.

use serde::{Deserialize, Serialize};

use crate::{GroupV1Id, GroupV2Identifier, Identity, Timestamp, TrustLevel, Uid};

/// The entity a details or status event refers to.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SubjectRef {
    OwnedIdentity(Identity),
    Contact {
        owned: Identity,
        contact: Identity,
    },
    GroupV1 {
        owned: Identity,
        group: GroupV1Id,
    },
    GroupV2 {
        owned: Identity,
        group: GroupV2Identifier,
    },
}

impl SubjectRef {
    /// The owned identity whose view of the world this subject belongs to.
    pub fn owned_identity(&self) -> &Identity {
        match self {
            SubjectRef::OwnedIdentity(owned)
            | SubjectRef::Contact { owned, .. }
            | SubjectRef::GroupV1 { owned, .. }
            | SubjectRef::GroupV2 { owned, .. } => owned,
        }
    }
}

/// Everything observers of the engine can be told about.
///
/// Events are values: components push them into the per-transaction batch
/// and they only reach observers once the transaction committed.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeEvent {
    /// New published details arrived that differ from what was published before.
    NewPublishedDetails { subject: SubjectRef },
    /// The local user accepted the published details (`details` is the JSON payload).
    DetailsTrusted { subject: SubjectRef, details: String },
    /// A local draft became the published version.
    DetailsPublished { subject: SubjectRef, details: String },
    /// A downloaded photo was bound to a details version.
    PhotoSet {
        subject: SubjectRef,
        version: i32,
        is_trusted: bool,
    },
    /// Members or pending members of a group changed.
    MembershipChanged { subject: SubjectRef },
    TrustLevelIncreased {
        owned: Identity,
        contact: Identity,
        level: TrustLevel,
    },
    Frozen {
        owned: Identity,
        group: GroupV2Identifier,
    },
    Unfrozen {
        owned: Identity,
        group: GroupV2Identifier,
    },
    /// A Group-V2 reconciliation changed local state.
    GroupV2Updated {
        owned: Identity,
        group: GroupV2Identifier,
        by_me: bool,
    },
    /// An uploaded blob is superseded and may be deleted from the server.
    ServerUserDataReclaimable { owned: Identity, label: Uid },
    NewPushTopic { owned: Identity, topic: String },
    SharedSettingsChanged {
        owned: Identity,
        group: GroupV2Identifier,
        settings: Option<String>,
        timestamp: Timestamp,
    },
    Revoked { subject: SubjectRef },
    ActiveStatusChanged { subject: SubjectRef, active: bool },
    OneToOneChanged {
        owned: Identity,
        contact: Identity,
        one_to_one: bool,
    },
    /// A device gained or lost its pre-key (`contact` is `None` for owned devices).
    PreKeyAvailabilityChanged {
        owned: Identity,
        contact: Option<Identity>,
        device: Uid,
        available: bool,
    },
    CapabilitiesChanged {
        owned: Identity,
        contact: Option<Identity>,
        device: Uid,
    },
    ContactAdded { owned: Identity, contact: Identity },
    ContactDeleted { owned: Identity, contact: Identity },
    GroupCreated { subject: SubjectRef },
    GroupDeleted { subject: SubjectRef },
}
