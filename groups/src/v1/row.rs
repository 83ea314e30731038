use serde::{Deserialize, Serialize};
use veil_details::DetailsSubject;
use veil_store::{KeyBuilder, Record, Table};
use veil_types::{GroupOwner, GroupV1Id, Identity, SubjectRef, Timestamp};

pub(crate) fn group_key(owned: &Identity, group: &GroupV1Id) -> Vec<u8> {
    KeyBuilder::new().identity(owned).group_v1(group).build()
}

pub(crate) fn member_key(owned: &Identity, group: &GroupV1Id, member: &Identity) -> Vec<u8> {
    KeyBuilder::new()
        .identity(owned)
        .group_v1(group)
        .identity(member)
        .build()
}

/// A legacy group. `members_version` is bumped by the owner on every
/// membership change and copied by everyone else.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupV1Row {
    pub owned: Identity,
    pub id: GroupV1Id,
    pub owner: GroupOwner,
    pub published_details_version: i32,
    pub trusted_details_version: i32,
    pub members_version: u64,
    pub created: Timestamp,
}

impl GroupV1Row {
    /// Identity of the owner, resolving [`GroupOwner::Me`].
    pub fn owner_identity(&self) -> Identity {
        match self.owner {
            GroupOwner::Me => self.owned,
            GroupOwner::Contact(owner) => owner,
        }
    }
}

impl Record for GroupV1Row {
    const TABLE: Table = Table::GroupV1;

    fn key(&self) -> Vec<u8> {
        group_key(&self.owned, &self.id)
    }
}

impl DetailsSubject for GroupV1Row {
    const DETAILS_TABLE: Table = Table::GroupV1Details;

    fn details_prefix(&self) -> Vec<u8> {
        self.key()
    }

    fn subject_ref(&self) -> SubjectRef {
        SubjectRef::GroupV1 {
            owned: self.owned,
            group: self.id,
        }
    }

    fn published_version(&self) -> i32 {
        self.published_details_version
    }

    fn trusted_version(&self) -> i32 {
        self.trusted_details_version
    }

    fn set_versions(&mut self, published: i32, trusted: i32) {
        self.published_details_version = published;
        self.trusted_details_version = trusted;
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupV1MemberRow {
    pub owned: Identity,
    pub group: GroupV1Id,
    pub member: Identity,
}

impl Record for GroupV1MemberRow {
    const TABLE: Table = Table::GroupV1Member;

    fn key(&self) -> Vec<u8> {
        member_key(&self.owned, &self.group, &self.member)
    }
}

/// Someone the owner invited who is not a contact of ours yet. Carries the
/// details the owner shared for them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupV1PendingMemberRow {
    pub owned: Identity,
    pub group: GroupV1Id,
    pub member: Identity,
    pub details: String,
    pub declined: bool,
}

impl Record for GroupV1PendingMemberRow {
    const TABLE: Table = Table::GroupV1PendingMember;

    fn key(&self) -> Vec<u8> {
        member_key(&self.owned, &self.group, &self.member)
    }
}
