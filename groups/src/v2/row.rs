use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use veil_details::DetailsSubject;
use veil_store::{KeyBuilder, Record, Table};
use veil_types::{GroupV2Identifier, Identity, SubjectRef, Timestamp};

use crate::v2::admin_chain::AdministratorsChain;
use crate::v2::blob::BlobKeys;

pub(crate) fn group_key(owned: &Identity, group: &GroupV2Identifier) -> Vec<u8> {
    KeyBuilder::new().identity(owned).group_v2(group).build()
}

fn member_key(owned: &Identity, group: &GroupV2Identifier, member: &Identity) -> Vec<u8> {
    KeyBuilder::new()
        .identity(owned)
        .group_v2(group)
        .identity(member)
        .build()
}

/// A server-backed group as seen by one owned identity.
///
/// Keycloak groups carry no administrators chain and keep `version` and
/// both details versions at 0.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupV2Row {
    pub owned: Identity,
    pub identifier: GroupV2Identifier,
    pub own_permissions: BTreeSet<String>,
    pub own_invitation_nonce: Vec<u8>,
    pub version: i32,
    pub published_details_version: i32,
    pub trusted_details_version: i32,
    pub administrators_chain: Option<AdministratorsChain>,
    pub blob_keys: Option<BlobKeys>,
    pub frozen: bool,
    pub last_modification: Timestamp,
    pub push_topic: Option<String>,
    pub shared_settings: Option<String>,
    pub group_type: Option<String>,
}

impl Record for GroupV2Row {
    const TABLE: Table = Table::GroupV2;

    fn key(&self) -> Vec<u8> {
        group_key(&self.owned, &self.identifier)
    }
}

impl DetailsSubject for GroupV2Row {
    const DETAILS_TABLE: Table = Table::GroupV2Details;

    fn details_prefix(&self) -> Vec<u8> {
        self.key()
    }

    fn subject_ref(&self) -> SubjectRef {
        SubjectRef::GroupV2 {
            owned: self.owned,
            group: self.identifier.clone(),
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
pub struct GroupV2MemberRow {
    pub owned: Identity,
    pub group: GroupV2Identifier,
    pub member: Identity,
    pub permissions: BTreeSet<String>,
    pub invitation_nonce: Vec<u8>,
}

impl Record for GroupV2MemberRow {
    const TABLE: Table = Table::GroupV2Member;

    fn key(&self) -> Vec<u8> {
        member_key(&self.owned, &self.group, &self.member)
    }
}

/// A participant not yet backed by a confirmed contact relationship.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupV2PendingMemberRow {
    pub owned: Identity,
    pub group: GroupV2Identifier,
    pub member: Identity,
    pub permissions: BTreeSet<String>,
    pub invitation_nonce: Vec<u8>,
    pub details: String,
}

impl Record for GroupV2PendingMemberRow {
    const TABLE: Table = Table::GroupV2PendingMember;

    fn key(&self) -> Vec<u8> {
        member_key(&self.owned, &self.group, &self.member)
    }
}

pub(crate) fn member_row_key(owned: &Identity, group: &GroupV2Identifier, member: &Identity) -> Vec<u8> {
    member_key(owned, group, member)
}
