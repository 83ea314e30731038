//! Member / pending-member diff shared by server and keycloak groups.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;
use veil_details::DetailsSubject;
use veil_store::{ReadExt, ReadTxn, Session, StoreError, WriteExt};
use veil_types::{ChangeEvent, GroupV2Identifier, Identity};

use crate::v2::row::{group_key, member_row_key, GroupV2MemberRow, GroupV2PendingMemberRow, GroupV2Row};

/// One participant of an incoming snapshot, minus its identity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct IncomingMember {
    pub permissions: BTreeSet<String>,
    pub invitation_nonce: Vec<u8>,
    pub details: String,
}

pub fn members<R: ReadTxn + ?Sized>(
    txn: &R,
    owned: &Identity,
    group: &GroupV2Identifier,
) -> Result<Vec<GroupV2MemberRow>, StoreError> {
    txn.scan_records(&group_key(owned, group))
}

pub fn pending_members<R: ReadTxn + ?Sized>(
    txn: &R,
    owned: &Identity,
    group: &GroupV2Identifier,
) -> Result<Vec<GroupV2PendingMemberRow>, StoreError> {
    txn.scan_records(&group_key(owned, group))
}

pub fn get_member<R: ReadTxn + ?Sized>(
    txn: &R,
    owned: &Identity,
    group: &GroupV2Identifier,
    member: &Identity,
) -> Result<Option<GroupV2MemberRow>, StoreError> {
    txn.get_record(&member_row_key(owned, group, member))
}

pub fn get_pending_member<R: ReadTxn + ?Sized>(
    txn: &R,
    owned: &Identity,
    group: &GroupV2Identifier,
    member: &Identity,
) -> Result<Option<GroupV2PendingMemberRow>, StoreError> {
    txn.get_record(&member_row_key(owned, group, member))
}

/// Bring members and pending members in line with `incoming`.
///
/// Members keep their row while their invitation nonce is unchanged; a new
/// nonce sends them back to the pending set. Returns the identities whose
/// invitation must be (re)accepted and whether anything was written.
pub(crate) fn reconcile_members(
    session: &mut Session<'_>,
    group: &GroupV2Row,
    mut incoming: BTreeMap<Identity, IncomingMember>,
) -> Result<(Vec<Identity>, bool), StoreError> {
    let owned = group.owned;
    let id = &group.identifier;
    let mut new_nonces = Vec::new();
    let mut changed = false;

    for mut member in members(&*session, &owned, id)? {
        let key = member_row_key(&owned, id, &member.member);
        match incoming.remove(&member.member) {
            None => {
                debug!(member = %member.member, "member left the group");
                session.delete_record::<GroupV2MemberRow>(&key)?;
                changed = true;
            }
            Some(entry) if entry.invitation_nonce != member.invitation_nonce => {
                debug!(member = %member.member, "member re-invited");
                session.delete_record::<GroupV2MemberRow>(&key)?;
                incoming.insert(member.member, entry);
                changed = true;
            }
            Some(entry) => {
                if entry.permissions != member.permissions {
                    member.permissions = entry.permissions;
                    session.put_record(&member)?;
                    changed = true;
                }
            }
        }
    }

    for pending in pending_members(&*session, &owned, id)? {
        let Some(entry) = incoming.remove(&pending.member) else {
            debug!(member = %pending.member, "pending member withdrawn");
            session.delete_record::<GroupV2PendingMemberRow>(&member_row_key(&owned, id, &pending.member))?;
            changed = true;
            continue;
        };
        if entry.invitation_nonce != pending.invitation_nonce {
            new_nonces.push(pending.member);
        }
        let updated = GroupV2PendingMemberRow {
            permissions: entry.permissions,
            invitation_nonce: entry.invitation_nonce,
            details: entry.details,
            ..pending.clone()
        };
        if updated != pending {
            session.put_record(&updated)?;
            changed = true;
        }
    }

    for (member, entry) in incoming {
        if member == owned {
            continue;
        }
        session.put_record(&GroupV2PendingMemberRow {
            owned,
            group: id.clone(),
            member,
            permissions: entry.permissions,
            invitation_nonce: entry.invitation_nonce,
            details: entry.details,
        })?;
        new_nonces.push(member);
        changed = true;
    }

    if changed {
        session.emit(ChangeEvent::MembershipChanged {
            subject: group.subject_ref(),
        });
    }
    Ok((new_nonces, changed))
}
