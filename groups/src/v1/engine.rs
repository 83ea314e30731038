//! Legacy group operations.
//!
//! Owned groups are edited through drafts and publish their details to
//! members. Joined groups take the owner's published details and membership
//! as they come.

use tracing::{debug, info};
use veil_contacts::contact::{create_or_add_origin, get_contact};
use veil_contacts::{TrustLevelPolicy, TrustOrigin, TrustOriginKind};
use veil_crypto::EntropySource;
use veil_details::server_user_data;
use veil_details::versioned::{self, DetailsUpdate, DraftOutcome};
use veil_details::{decode_payload, DetailsRow, DetailsSubject, GroupDetails, IncomingDetails, ServerUserDataOwner};
use veil_store::{KeyBuilder, PhotoStore, ReadExt, ReadTxn, Record, Session, StoreError, Table, WriteExt};
use veil_types::{ChangeEvent, GroupOwner, GroupV1Id, Identity, Timestamp, Uid};

use crate::v1::row::{group_key, member_key, GroupV1MemberRow, GroupV1PendingMemberRow, GroupV1Row};
use crate::GroupError;

pub fn get_group<R: ReadTxn + ?Sized>(
    txn: &R,
    owned: &Identity,
    group: &GroupV1Id,
) -> Result<Option<GroupV1Row>, StoreError> {
    txn.get_record(&group_key(owned, group))
}

fn require_group<R: ReadTxn + ?Sized>(
    txn: &R,
    owned: &Identity,
    group: &GroupV1Id,
) -> Result<GroupV1Row, GroupError> {
    get_group(txn, owned, group)?.ok_or_else(|| GroupError::GroupNotFound(format!("{:?}", group)))
}

fn require_owned(group: &GroupV1Row) -> Result<(), GroupError> {
    if group.owner.is_me() {
        Ok(())
    } else {
        Err(GroupError::Precondition("only the group owner may do this".into()))
    }
}

fn require_joined(group: &GroupV1Row) -> Result<(), GroupError> {
    if group.owner.is_me() {
        Err(GroupError::Precondition(
            "the owner's own group is not driven from outside".into(),
        ))
    } else {
        Ok(())
    }
}

pub fn groups<R: ReadTxn + ?Sized>(txn: &R, owned: &Identity) -> Result<Vec<GroupV1Row>, StoreError> {
    txn.scan_records(&KeyBuilder::new().identity(owned).build())
}

/// Groups owned by `owned` itself.
pub fn owned_groups<R: ReadTxn + ?Sized>(txn: &R, owned: &Identity) -> Result<Vec<GroupV1Row>, StoreError> {
    Ok(groups(txn, owned)?.into_iter().filter(|g| g.owner.is_me()).collect())
}

/// Groups owned by `contact`, as joined by `owned`.
pub fn groups_owned_by<R: ReadTxn + ?Sized>(
    txn: &R,
    owned: &Identity,
    contact: &Identity,
) -> Result<Vec<GroupV1Row>, StoreError> {
    txn.scan_records(&KeyBuilder::new().identity(owned).identity(contact).build())
}

pub fn members<R: ReadTxn + ?Sized>(
    txn: &R,
    owned: &Identity,
    group: &GroupV1Id,
) -> Result<Vec<GroupV1MemberRow>, StoreError> {
    txn.scan_records(&group_key(owned, group))
}

pub fn pending_members<R: ReadTxn + ?Sized>(
    txn: &R,
    owned: &Identity,
    group: &GroupV1Id,
) -> Result<Vec<GroupV1PendingMemberRow>, StoreError> {
    txn.scan_records(&group_key(owned, group))
}

pub fn published_details<R: ReadTxn + ?Sized>(
    txn: &R,
    owned: &Identity,
    group: &GroupV1Id,
) -> Result<DetailsRow, GroupError> {
    let row = require_group(txn, owned, group)?;
    Ok(versioned::published(txn, &row)?)
}

fn validate_details(payload: &str) -> Result<(), GroupError> {
    let details: GroupDetails = decode_payload(payload)?;
    if details.name.trim().is_empty() {
        return Err(GroupError::Validation("group details have no name".into()));
    }
    Ok(())
}

fn membership_changed(session: &mut Session<'_>, group: &GroupV1Row) {
    session.emit(ChangeEvent::MembershipChanged {
        subject: group.subject_ref(),
    });
}

fn insert_group(
    session: &mut Session<'_>,
    mut row: GroupV1Row,
    details: IncomingDetails,
) -> Result<GroupV1Row, GroupError> {
    validate_details(&details.payload)?;
    if session.contains_record::<GroupV1Row>(&row.key())? {
        return Err(GroupError::Validation(format!("group {:?} already exists", row.id)));
    }
    versioned::create_initial(session, &mut row, details.version, &details.payload, details.photo_source)?;
    session.emit(ChangeEvent::GroupCreated {
        subject: row.subject_ref(),
    });
    Ok(row)
}

/// Create a group owned by `owned`. `pending` lists the invitees with the
/// details we share for each of them.
pub fn create_owned_group(
    session: &mut Session<'_>,
    owned: &Identity,
    uid: Uid,
    details: &str,
    pending: Vec<(Identity, String)>,
    now: Timestamp,
) -> Result<GroupV1Row, GroupError> {
    let id = GroupV1Id::new(uid, *owned);
    let row = insert_group(
        session,
        GroupV1Row {
            owned: *owned,
            id,
            owner: GroupOwner::Me,
            published_details_version: 0,
            trusted_details_version: 0,
            members_version: 0,
            created: now,
        },
        IncomingDetails::new(0, details),
    )?;
    for (member, details) in pending {
        add_pending_member(session, owned, &id, &member, &details)?;
    }
    info!(group = ?id, "owned group created");
    Ok(row)
}

/// Create a group owned by one of our contacts, from the details the owner
/// sent us. They start out trusted.
pub fn create_joined_group(
    session: &mut Session<'_>,
    owned: &Identity,
    id: &GroupV1Id,
    details: IncomingDetails,
    now: Timestamp,
) -> Result<GroupV1Row, GroupError> {
    if id.owner == *owned {
        return Err(GroupError::Validation("a joined group has another owner".into()));
    }
    if get_contact(&*session, owned, &id.owner)?.is_none() {
        return Err(GroupError::Precondition(format!(
            "group owner {} is not a contact",
            id.owner
        )));
    }
    if details.version < 0 {
        return Err(GroupError::Validation("details version is negative".into()));
    }
    let row = insert_group(
        session,
        GroupV1Row {
            owned: *owned,
            id: *id,
            owner: GroupOwner::Contact(id.owner),
            published_details_version: details.version,
            trusted_details_version: details.version,
            members_version: 0,
            created: now,
        },
        details,
    )?;
    info!(group = ?id, "joined group");
    Ok(row)
}

/// Details published by the owner of a joined group.
pub fn update_published_details(
    session: &mut Session<'_>,
    owned: &Identity,
    id: &GroupV1Id,
    incoming: IncomingDetails,
) -> Result<DetailsUpdate, GroupError> {
    let mut row = require_group(&*session, owned, id)?;
    require_joined(&row)?;
    validate_details(&incoming.payload)?;
    Ok(versioned::update_published(session, &mut row, incoming, false)?)
}

pub fn trust_published_details(
    session: &mut Session<'_>,
    owned: &Identity,
    id: &GroupV1Id,
) -> Result<bool, GroupError> {
    let mut row = require_group(&*session, owned, id)?;
    require_joined(&row)?;
    Ok(versioned::trust(session, &mut row)?)
}

pub fn set_draft(
    session: &mut Session<'_>,
    owned: &Identity,
    id: &GroupV1Id,
    details: &str,
    photo_url: Option<String>,
) -> Result<DraftOutcome, GroupError> {
    let mut row = require_group(&*session, owned, id)?;
    require_owned(&row)?;
    validate_details(details)?;
    Ok(versioned::set_draft(session, &mut row, details, photo_url)?)
}

pub fn publish_draft(
    session: &mut Session<'_>,
    entropy: &dyn EntropySource,
    owned: &Identity,
    id: &GroupV1Id,
    next_refresh: Timestamp,
) -> Result<Option<DetailsRow>, GroupError> {
    let mut row = require_group(&*session, owned, id)?;
    require_owned(&row)?;
    Ok(versioned::publish_draft(session, &mut row, entropy, next_refresh)?)
}

pub fn discard_draft(session: &mut Session<'_>, owned: &Identity, id: &GroupV1Id) -> Result<bool, GroupError> {
    let mut row = require_group(&*session, owned, id)?;
    require_owned(&row)?;
    Ok(versioned::discard_draft(session, &mut row)?)
}

pub fn set_downloaded_photo(
    session: &mut Session<'_>,
    photos: &dyn PhotoStore,
    owned: &Identity,
    id: &GroupV1Id,
    version: i32,
    bytes: &[u8],
) -> Result<bool, GroupError> {
    let row = require_group(&*session, owned, id)?;
    Ok(versioned::set_downloaded_photo(session, &row, photos, version, bytes)?)
}

/// Add a contact as a member. Returns false when it already was one.
pub fn add_member(
    session: &mut Session<'_>,
    owned: &Identity,
    id: &GroupV1Id,
    member: &Identity,
) -> Result<bool, GroupError> {
    let row = require_group(&*session, owned, id)?;
    if member == owned {
        return Err(GroupError::Validation("we are implicitly a member".into()));
    }
    if get_contact(&*session, owned, member)?.is_none() {
        return Err(GroupError::Precondition(format!("{member} is not a contact")));
    }
    let key = member_key(owned, id, member);
    if session.contains_record::<GroupV1MemberRow>(&key)? {
        return Ok(false);
    }
    session.delete_record::<GroupV1PendingMemberRow>(&key)?;
    session.put_record(&GroupV1MemberRow {
        owned: *owned,
        group: *id,
        member: *member,
    })?;
    membership_changed(session, &row);
    Ok(true)
}

pub fn remove_member(
    session: &mut Session<'_>,
    owned: &Identity,
    id: &GroupV1Id,
    member: &Identity,
) -> Result<bool, GroupError> {
    let row = require_group(&*session, owned, id)?;
    let removed = session.delete_record::<GroupV1MemberRow>(&member_key(owned, id, member))?;
    if removed {
        membership_changed(session, &row);
    }
    Ok(removed)
}

/// Record an invitee. Returns false when it already was pending or a member.
pub fn add_pending_member(
    session: &mut Session<'_>,
    owned: &Identity,
    id: &GroupV1Id,
    member: &Identity,
    details: &str,
) -> Result<bool, GroupError> {
    let row = require_group(&*session, owned, id)?;
    if member == owned {
        return Err(GroupError::Validation("we cannot be pending in our own view".into()));
    }
    decode_payload::<veil_details::IdentityDetails>(details)?;
    let key = member_key(owned, id, member);
    if session.contains_record::<GroupV1MemberRow>(&key)?
        || session.contains_record::<GroupV1PendingMemberRow>(&key)?
    {
        return Ok(false);
    }
    session.put_record(&GroupV1PendingMemberRow {
        owned: *owned,
        group: *id,
        member: *member,
        details: details.to_string(),
        declined: false,
    })?;
    membership_changed(session, &row);
    Ok(true)
}

pub fn remove_pending_member(
    session: &mut Session<'_>,
    owned: &Identity,
    id: &GroupV1Id,
    member: &Identity,
) -> Result<bool, GroupError> {
    let row = require_group(&*session, owned, id)?;
    let removed = session.delete_record::<GroupV1PendingMemberRow>(&member_key(owned, id, member))?;
    if removed {
        membership_changed(session, &row);
    }
    Ok(removed)
}

pub fn set_pending_member_declined(
    session: &mut Session<'_>,
    owned: &Identity,
    id: &GroupV1Id,
    member: &Identity,
    declined: bool,
) -> Result<bool, GroupError> {
    let row = require_group(&*session, owned, id)?;
    let key = member_key(owned, id, member);
    let Some(mut pending) = session.get_record::<GroupV1PendingMemberRow>(&key)? else {
        return Ok(false);
    };
    if pending.declined == declined {
        return Ok(false);
    }
    pending.declined = declined;
    session.put_record(&pending)?;
    membership_changed(session, &row);
    Ok(true)
}

/// Promote an invitee to member. The contact is created from the pending
/// details when we do not know it yet, and gains a group trust origin
/// vouched for by the group owner.
pub fn move_pending_member_to_members(
    session: &mut Session<'_>,
    policy: &TrustLevelPolicy,
    owned: &Identity,
    id: &GroupV1Id,
    member: &Identity,
    now: Timestamp,
) -> Result<bool, GroupError> {
    let row = require_group(&*session, owned, id)?;
    let key = member_key(owned, id, member);
    let Some(pending) = session.get_record::<GroupV1PendingMemberRow>(&key)? else {
        debug!(group = ?id, member = %member, "no such pending member");
        return Ok(false);
    };
    let origin = TrustOrigin::new(
        now,
        TrustOriginKind::Group {
            group_owner: row.owner_identity(),
        },
    );
    create_or_add_origin(session, policy, owned, member, &pending.details, origin)?;
    session.delete_record::<GroupV1PendingMemberRow>(&key)?;
    session.put_record(&GroupV1MemberRow {
        owned: *owned,
        group: *id,
        member: *member,
    })?;
    membership_changed(session, &row);
    Ok(true)
}

/// Bump the members version of a group we own. Returns the new version.
pub fn increment_group_members_version(
    session: &mut Session<'_>,
    owned: &Identity,
    id: &GroupV1Id,
) -> Result<u64, GroupError> {
    let mut row = require_group(&*session, owned, id)?;
    require_owned(&row)?;
    row.members_version = row
        .members_version
        .checked_add(1)
        .ok_or_else(|| GroupError::Validation("members version overflow".into()))?;
    session.put_record(&row)?;
    Ok(row.members_version)
}

/// Copy the members version announced by the owner of a joined group.
pub fn set_group_members_version(
    session: &mut Session<'_>,
    owned: &Identity,
    id: &GroupV1Id,
    version: u64,
) -> Result<(), GroupError> {
    let mut row = require_group(&*session, owned, id)?;
    require_joined(&row)?;
    if row.members_version != version {
        row.members_version = version;
        session.put_record(&row)?;
    }
    Ok(())
}

/// Delete a group with its details and membership. Photos we uploaded for
/// an owned group are reclaimed.
pub fn delete_group(session: &mut Session<'_>, owned: &Identity, id: &GroupV1Id) -> Result<bool, GroupError> {
    let Some(row) = get_group(&*session, owned, id)? else {
        return Ok(false);
    };
    versioned::delete_all(session, &row)?;
    let prefix = group_key(owned, id);
    session.delete_prefix(Table::GroupV1Member, &prefix)?;
    session.delete_prefix(Table::GroupV1PendingMember, &prefix)?;
    if row.owner.is_me() {
        server_user_data::reclaim_all_for_owner(session, owned, &ServerUserDataOwner::GroupV1(id.uid))?;
    }
    session.delete_record::<GroupV1Row>(&prefix)?;
    info!(group = ?id, "group deleted");
    session.emit(ChangeEvent::GroupDeleted {
        subject: row.subject_ref(),
    });
    Ok(true)
}

/// Delete every legacy group of an owned identity.
pub fn delete_all(session: &mut Session<'_>, owned: &Identity) -> Result<usize, GroupError> {
    let all = groups(&*session, owned)?;
    for row in &all {
        delete_group(session, owned, &row.id)?;
    }
    Ok(all.len())
}
