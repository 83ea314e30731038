//! Lifecycle and reconciliation of server-backed groups.

use std::collections::BTreeMap;

use tracing::{debug, info, warn};
use veil_contacts::contact::{create_or_add_origin, get_contact};
use veil_contacts::ledger::add_origin;
use veil_contacts::{TrustLevelPolicy, TrustOrigin, TrustOriginKind};
use veil_crypto::ClaimsDecoder;
use veil_details::server_user_data;
use veil_details::versioned::{self, DetailsUpdate};
use veil_details::{
    same_photo, DetailsRow, DetailsSubject, IncomingDetails, PhotoSource, ServerUserDataOwner,
    ServerUserDataRow, PLACEHOLDER_VERSION,
};
use veil_store::{KeyBuilder, PhotoStore, ReadExt, ReadTxn, Record, Session, StoreError, Table, WriteExt};
use veil_types::{
    ChangeEvent, GroupV2Category, GroupV2Identifier, Identity, KeyPair, SubjectRef, Timestamp,
};

use crate::v2::admin_chain::AdministratorsChain;
use crate::v2::blob::{permissions, BlobKeys, BlobMember, BlobUpdate, GroupV2Backup, KeycloakBlob};
use crate::v2::keycloak::decode_member;
use crate::v2::members::{get_pending_member, reconcile_members, IncomingMember};
use crate::v2::row::{group_key, member_row_key, GroupV2MemberRow, GroupV2PendingMemberRow, GroupV2Row};
use crate::{ChainError, GroupError};

/// Result of merging a snapshot into local state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Applied. Carries the identities that received a new invitation nonce
    /// and must go through invitation acceptance again.
    Reconciled(Vec<Identity>),
    /// Older than local state; nothing was written.
    Stale,
    /// The snapshot no longer lists us; nothing was written.
    SelfRemoved,
    /// The administrators chain does not extend the stored one; nothing was
    /// written.
    ChainRejected,
}

/// Clock readings an operation needs: `now` for timestamps and
/// `next_refresh` for photos registered for keep-alive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Schedule {
    pub now: Timestamp,
    pub next_refresh: Timestamp,
}

/// A group created locally, before its first blob upload.
#[derive(Clone, Debug)]
pub struct NewGroupV2 {
    pub server_url: String,
    /// Administrators besides the creator.
    pub administrators: Vec<Identity>,
    pub invited: Vec<BlobMember>,
    pub details: IncomingDetails,
    pub keys: BlobKeys,
    pub own_invitation_nonce: Vec<u8>,
    pub group_type: Option<String>,
}

pub fn get_group<R: ReadTxn + ?Sized>(
    txn: &R,
    owned: &Identity,
    identifier: &GroupV2Identifier,
) -> Result<Option<GroupV2Row>, StoreError> {
    txn.get_record(&group_key(owned, identifier))
}

fn require_group<R: ReadTxn + ?Sized>(
    txn: &R,
    owned: &Identity,
    identifier: &GroupV2Identifier,
) -> Result<GroupV2Row, GroupError> {
    get_group(txn, owned, identifier)?.ok_or_else(|| GroupError::GroupNotFound(identifier.to_string()))
}

pub fn groups<R: ReadTxn + ?Sized>(txn: &R, owned: &Identity) -> Result<Vec<GroupV2Row>, StoreError> {
    txn.scan_records(&KeyBuilder::new().identity(owned).build())
}

/// Groups waiting for their first confirmed server round-trip.
pub fn get_all_frozen<R: ReadTxn + ?Sized>(txn: &R, owned: &Identity) -> Result<Vec<GroupV2Row>, StoreError> {
    Ok(groups(txn, owned)?.into_iter().filter(|group| group.frozen).collect())
}

pub fn keycloak_groups<R: ReadTxn + ?Sized>(txn: &R, owned: &Identity) -> Result<Vec<GroupV2Row>, StoreError> {
    Ok(groups(txn, owned)?
        .into_iter()
        .filter(|group| group.identifier.is_keycloak())
        .collect())
}

pub fn published_details<R: ReadTxn + ?Sized>(
    txn: &R,
    owned: &Identity,
    identifier: &GroupV2Identifier,
) -> Result<DetailsRow, GroupError> {
    let group = require_group(txn, owned, identifier)?;
    Ok(versioned::published(txn, &group)?)
}

fn register_photo(
    session: &mut Session<'_>,
    group: &GroupV2Row,
    source: &PhotoSource,
    next_refresh: Timestamp,
) -> Result<(), StoreError> {
    server_user_data::register(
        session,
        &ServerUserDataRow {
            owned: group.owned,
            label: source.label,
            next_refresh,
            owner: ServerUserDataOwner::GroupV2(group.identifier.clone()),
        },
    )
}

/// Persist a brand-new group row with its first details.
fn insert_group(
    session: &mut Session<'_>,
    group: &mut GroupV2Row,
    details: IncomingDetails,
    next_refresh: Timestamp,
) -> Result<(), GroupError> {
    if session.contains_record::<GroupV2Row>(&group.key())? {
        return Err(GroupError::Validation(format!(
            "group {} already exists",
            group.identifier
        )));
    }
    let photo = details.photo_source.clone();
    versioned::create_initial(session, group, details.version, &details.payload, photo.clone())?;
    if let Some(source) = photo.filter(|source| source.origin == Some(group.owned)) {
        register_photo(session, group, &source, next_refresh)?;
    }
    session.emit(ChangeEvent::GroupCreated {
        subject: group.subject_ref(),
    });
    Ok(())
}

fn blank_group(owned: Identity, identifier: GroupV2Identifier, now: Timestamp) -> GroupV2Row {
    GroupV2Row {
        owned,
        identifier,
        own_permissions: Default::default(),
        own_invitation_nonce: Vec::new(),
        version: 0,
        published_details_version: PLACEHOLDER_VERSION,
        trusted_details_version: PLACEHOLDER_VERSION,
        administrators_chain: None,
        blob_keys: None,
        frozen: false,
        last_modification: now,
        push_topic: None,
        shared_settings: None,
        group_type: None,
    }
}

/// Create a group we administer. It stays frozen until the first blob
/// upload is confirmed.
pub fn create_new(
    session: &mut Session<'_>,
    creator: &KeyPair,
    request: NewGroupV2,
    schedule: Schedule,
) -> Result<GroupV2Row, GroupError> {
    if request.details.version < 0 {
        return Err(GroupError::Validation("details version is negative".into()));
    }
    let owned = creator.public;
    let (chain, uid) = AdministratorsChain::create(creator, request.administrators)?;
    let identifier = GroupV2Identifier::new(uid, request.server_url, GroupV2Category::Server);
    let mut group = GroupV2Row {
        own_permissions: permissions::administrator(),
        own_invitation_nonce: request.own_invitation_nonce,
        administrators_chain: Some(chain),
        blob_keys: Some(request.keys),
        frozen: true,
        group_type: request.group_type,
        ..blank_group(owned, identifier.clone(), schedule.now)
    };
    insert_group(session, &mut group, request.details, schedule.next_refresh)?;

    for invited in request.invited.into_iter().filter(|m| m.identity != owned) {
        session.put_record(&GroupV2PendingMemberRow {
            owned,
            group: identifier.clone(),
            member: invited.identity,
            permissions: invited.permissions,
            invitation_nonce: invited.invitation_nonce,
            details: invited.details,
        })?;
    }
    info!(group = %identifier, "group created");
    session.emit(ChangeEvent::Frozen {
        owned,
        group: identifier,
    });
    Ok(group)
}

/// Create a group we were invited to from its first blob. The blob's
/// details are accepted as trusted.
pub fn create_joined(
    session: &mut Session<'_>,
    owned: &Identity,
    identifier: &GroupV2Identifier,
    update: BlobUpdate,
    schedule: Schedule,
) -> Result<(GroupV2Row, Vec<Identity>), GroupError> {
    if identifier.is_keycloak() {
        return Err(GroupError::Validation(
            "keycloak groups are created from identity-server snapshots".into(),
        ));
    }
    let mut group = blank_group(*owned, identifier.clone(), schedule.now);
    insert_group(session, &mut group, IncomingDetails::new(PLACEHOLDER_VERSION, "{}"), schedule.next_refresh)?;

    match reconcile(session, owned, identifier, update, schedule)? {
        ReconcileOutcome::Reconciled(new_nonces) => {
            let mut group = require_group(&*session, owned, identifier)?;
            versioned::trust(session, &mut group)?;
            info!(group = %identifier, "joined group");
            Ok((group, new_nonces))
        }
        ReconcileOutcome::SelfRemoved => Err(GroupError::Validation(format!(
            "not a member of group {identifier}"
        ))),
        outcome => Err(GroupError::Precondition(format!(
            "first blob of group {identifier} was not applied: {outcome:?}"
        ))),
    }
}

/// Recreate a group from a backup. Membership is not part of a backup; the
/// group stays frozen until it is reconciled online.
pub fn restore_from_backup(
    session: &mut Session<'_>,
    owned: &Identity,
    identifier: &GroupV2Identifier,
    backup: GroupV2Backup,
    schedule: Schedule,
) -> Result<GroupV2Row, GroupError> {
    let mut group = blank_group(*owned, identifier.clone(), schedule.now);
    group.frozen = true;
    group.own_permissions = backup.own_permissions;
    group.blob_keys = backup.keys;
    group.push_topic = backup.push_topic;
    group.shared_settings = backup.shared_settings;

    let details = if identifier.is_keycloak() {
        IncomingDetails::new(0, backup.details.payload)
    } else {
        if let Some(chain) = backup.administrators_chain {
            group.administrators_chain = Some(chain.verify(&identifier.group_uid)?.into_chain());
        }
        group.version = backup.version.max(0);
        backup.details
    };
    insert_group(session, &mut group, details, schedule.next_refresh)?;
    info!(group = %identifier, "group restored from backup");
    session.emit(ChangeEvent::Frozen {
        owned: *owned,
        group: identifier.clone(),
    });
    Ok(group)
}

/// Returns false when the group already was in the requested state.
pub fn set_frozen(
    session: &mut Session<'_>,
    owned: &Identity,
    identifier: &GroupV2Identifier,
    frozen: bool,
) -> Result<bool, GroupError> {
    let mut group = require_group(&*session, owned, identifier)?;
    if group.frozen == frozen {
        return Ok(false);
    }
    group.frozen = frozen;
    session.put_record(&group)?;
    let (owned, group) = (*owned, identifier.clone());
    session.emit(if frozen {
        ChangeEvent::Frozen { owned, group }
    } else {
        ChangeEvent::Unfrozen { owned, group }
    });
    Ok(true)
}

/// Merge an authoritative server blob into local state.
///
/// The blob's administrators chain was verified when the blob was built.
/// Stale blobs, blobs whose chain does not extend ours and blobs that no
/// longer list us are reported without touching the store, checked in that
/// order. Any error
/// leaves the session to be rolled back by the caller.
pub fn reconcile(
    session: &mut Session<'_>,
    owned: &Identity,
    identifier: &GroupV2Identifier,
    update: BlobUpdate,
    schedule: Schedule,
) -> Result<ReconcileOutcome, GroupError> {
    let BlobUpdate {
        blob,
        keys,
        updated_by_me,
    } = update;
    let mut group = require_group(&*session, owned, identifier)?;
    if identifier.is_keycloak() {
        return Err(GroupError::Precondition(
            "keycloak groups reconcile from identity-server snapshots".into(),
        ));
    }
    if blob.administrators_chain.group_uid() != &identifier.group_uid {
        return Err(ChainError::GroupUidMismatch.into());
    }
    if blob.version < group.version {
        debug!(group = %identifier, incoming = blob.version, local = group.version, "ignoring stale group blob");
        return Ok(ReconcileOutcome::Stale);
    }
    // Forks are rejected whatever their member list says.
    if let Some(stored) = &group.administrators_chain {
        if !blob.administrators_chain.is_prefixed_by(stored) {
            warn!(group = %identifier, version = blob.version, "administrators chain does not extend the stored one");
            return Ok(ReconcileOutcome::ChainRejected);
        }
    }

    let mut incoming: BTreeMap<Identity, IncomingMember> = blob
        .members
        .into_iter()
        .map(|member| {
            (
                member.identity,
                IncomingMember {
                    permissions: member.permissions,
                    invitation_nonce: member.invitation_nonce,
                    details: member.details,
                },
            )
        })
        .collect();
    let Some(own) = incoming.remove(owned) else {
        warn!(group = %identifier, version = blob.version, "group blob no longer lists us");
        return Ok(ReconcileOutcome::SelfRemoved);
    };

    let before = group.clone();
    group.version = blob.version;
    group.own_permissions = own.permissions;
    group.own_invitation_nonce = own.invitation_nonce;
    group.administrators_chain = Some(blob.administrators_chain.into_chain());
    group.blob_keys = Some(keys);
    group.group_type = blob.group_type;
    let mut changed = group != before;
    if changed {
        group.last_modification = schedule.now;
        session.put_record(&group)?;
    }

    changed |= reconcile_details(session, &mut group, blob.details, updated_by_me, schedule.next_refresh)?;
    let (new_nonces, members_changed) = reconcile_members(session, &group, incoming)?;
    changed |= members_changed;

    if changed {
        info!(group = %identifier, version = group.version, by_me = updated_by_me, "group reconciled");
        session.emit(ChangeEvent::GroupV2Updated {
            owned: *owned,
            group: identifier.clone(),
            by_me: updated_by_me,
        });
    } else {
        debug!(group = %identifier, version = group.version, "group blob already applied");
    }
    Ok(ReconcileOutcome::Reconciled(new_nonces))
}

/// Apply the blob's details and keep server user data in step with the
/// photo. Our own updates are trusted right away.
fn reconcile_details(
    session: &mut Session<'_>,
    group: &mut GroupV2Row,
    details: IncomingDetails,
    updated_by_me: bool,
    next_refresh: Timestamp,
) -> Result<bool, GroupError> {
    let previous = versioned::published(&*session, group)?;
    let update = versioned::update_published(session, group, details, true)?;
    if !matches!(update, DetailsUpdate::Applied { .. }) {
        return Ok(false);
    }
    let current = versioned::published(&*session, group)?;
    if !same_photo(previous.photo_source.as_ref(), current.photo_source.as_ref()) {
        let owned = group.owned;
        let ours = |source: &&PhotoSource| source.origin == Some(owned);
        if let Some(old) = previous.photo_source.as_ref().filter(ours) {
            server_user_data::reclaim(session, &group.owned, &old.label)?;
        }
        if let Some(new) = current.photo_source.as_ref().filter(ours) {
            register_photo(session, group, new, next_refresh)?;
        }
    }
    if updated_by_me {
        versioned::trust(session, group)?;
    }
    Ok(true)
}

/// Create a keycloak group from its first identity-server snapshot.
pub fn create_keycloak(
    session: &mut Session<'_>,
    decoder: &dyn ClaimsDecoder,
    owned: &Identity,
    identifier: &GroupV2Identifier,
    blob: KeycloakBlob,
) -> Result<GroupV2Row, GroupError> {
    if !identifier.is_keycloak() {
        return Err(GroupError::Validation(format!(
            "{identifier} is not a keycloak group"
        )));
    }
    let mut group = blank_group(*owned, identifier.clone(), Timestamp::new(0));
    insert_group(session, &mut group, IncomingDetails::new(0, blob.details.clone()), Timestamp::new(0))?;

    match reconcile_keycloak(session, decoder, owned, identifier, blob)? {
        ReconcileOutcome::SelfRemoved => Err(GroupError::Validation(format!(
            "not a member of keycloak group {identifier}"
        ))),
        _ => {
            info!(group = %identifier, "keycloak group created");
            require_group(&*session, owned, identifier)
        }
    }
}

/// Merge an identity-server snapshot into a keycloak group.
///
/// Members whose token cannot be read are skipped, but a snapshot that
/// does not list us is only taken as a removal when every token was read.
/// Details stay at version 0 and are trusted as soon as they arrive.
pub fn reconcile_keycloak(
    session: &mut Session<'_>,
    decoder: &dyn ClaimsDecoder,
    owned: &Identity,
    identifier: &GroupV2Identifier,
    blob: KeycloakBlob,
) -> Result<ReconcileOutcome, GroupError> {
    let mut group = require_group(&*session, owned, identifier)?;
    if !identifier.is_keycloak() {
        return Err(GroupError::Precondition(format!(
            "{identifier} is not a keycloak group"
        )));
    }
    if blob.last_modification < group.last_modification {
        debug!(group = %identifier, "ignoring stale keycloak snapshot");
        return Ok(ReconcileOutcome::Stale);
    }

    let mut incoming = BTreeMap::new();
    let mut unreadable = 0usize;
    for member in blob.members {
        let Some(claims) = decode_member(decoder, &member.signed_details) else {
            unreadable += 1;
            continue;
        };
        incoming.insert(
            claims.identity,
            IncomingMember {
                permissions: member.permissions,
                invitation_nonce: Vec::new(),
                details: member.signed_details,
            },
        );
    }
    let Some(own) = incoming.remove(owned) else {
        if unreadable > 0 {
            // one of the unreadable tokens may be ours
            return Err(GroupError::Validation(format!(
                "keycloak snapshot of {identifier} does not list us and has {unreadable} unreadable member tokens"
            )));
        }
        warn!(group = %identifier, "keycloak snapshot no longer lists us");
        return Ok(ReconcileOutcome::SelfRemoved);
    };

    let before = group.clone();
    group.own_permissions = own.permissions;
    if blob.push_topic != group.push_topic {
        if let Some(topic) = &blob.push_topic {
            session.emit(ChangeEvent::NewPushTopic {
                owned: *owned,
                topic: topic.clone(),
            });
        }
        group.push_topic = blob.push_topic;
    }
    if blob.shared_settings != group.shared_settings {
        session.emit(ChangeEvent::SharedSettingsChanged {
            owned: *owned,
            group: identifier.clone(),
            settings: blob.shared_settings.clone(),
            timestamp: blob.last_modification,
        });
        group.shared_settings = blob.shared_settings;
    }
    let mut changed = group != before;
    group.last_modification = blob.last_modification;
    if group != before {
        session.put_record(&group)?;
    }

    let update = versioned::update_published(session, &mut group, IncomingDetails::new(0, blob.details), true)?;
    if matches!(update, DetailsUpdate::Applied { .. }) {
        versioned::trust(session, &mut group)?;
        changed = true;
    }
    let (new_nonces, members_changed) = reconcile_members(session, &group, incoming)?;
    changed |= members_changed;

    if changed {
        info!(group = %identifier, "keycloak group reconciled");
        session.emit(ChangeEvent::GroupV2Updated {
            owned: *owned,
            group: identifier.clone(),
            by_me: false,
        });
    }
    Ok(ReconcileOutcome::Reconciled(new_nonces))
}

/// Promote a pending member whose invitation was accepted.
///
/// Server groups record a group trust origin for the member, creating the
/// contact from the pending details if needed. Keycloak groups only promote
/// members already certified by our identity server. Returns false when
/// nothing was promoted.
pub fn move_pending_member_to_members(
    session: &mut Session<'_>,
    policy: &TrustLevelPolicy,
    owned: &Identity,
    identifier: &GroupV2Identifier,
    member: &Identity,
    now: Timestamp,
) -> Result<bool, GroupError> {
    require_group(&*session, owned, identifier)?;
    let Some(pending) = get_pending_member(&*session, owned, identifier, member)? else {
        debug!(group = %identifier, member = %member, "no such pending member");
        return Ok(false);
    };

    match identifier.category {
        GroupV2Category::Server => {
            let origin = TrustOrigin::new(
                now,
                TrustOriginKind::ServerGroupV2 {
                    group: identifier.clone(),
                },
            );
            create_or_add_origin(session, policy, owned, member, &pending.details, origin)?;
        }
        GroupV2Category::Keycloak => {
            let certified = get_contact(&*session, owned, member)?
                .is_some_and(|contact| contact.certified_by_own_keycloak);
            if !certified {
                debug!(group = %identifier, member = %member, "member not certified by our identity server yet");
                return Ok(false);
            }
            let origin = TrustOrigin::new(
                now,
                TrustOriginKind::IdentityServer {
                    server: identifier.server_url.clone(),
                },
            );
            add_origin(session, policy, owned, member, origin)?;
        }
    }

    session.delete_record::<GroupV2PendingMemberRow>(&member_row_key(owned, identifier, member))?;
    session.put_record(&GroupV2MemberRow {
        owned: *owned,
        group: identifier.clone(),
        member: *member,
        permissions: pending.permissions,
        invitation_nonce: pending.invitation_nonce,
    })?;
    session.emit(ChangeEvent::MembershipChanged {
        subject: SubjectRef::GroupV2 {
            owned: *owned,
            group: identifier.clone(),
        },
    });
    Ok(true)
}

pub fn trust_details(
    session: &mut Session<'_>,
    owned: &Identity,
    identifier: &GroupV2Identifier,
) -> Result<bool, GroupError> {
    let mut group = require_group(&*session, owned, identifier)?;
    Ok(versioned::trust(session, &mut group)?)
}

pub fn set_downloaded_photo(
    session: &mut Session<'_>,
    photos: &dyn PhotoStore,
    owned: &Identity,
    identifier: &GroupV2Identifier,
    version: i32,
    bytes: &[u8],
) -> Result<bool, GroupError> {
    let group = require_group(&*session, owned, identifier)?;
    Ok(versioned::set_downloaded_photo(session, &group, photos, version, bytes)?)
}

/// Delete a group with its details, members and pending members. Photos we
/// uploaded for it are reclaimed.
pub fn delete_group(
    session: &mut Session<'_>,
    owned: &Identity,
    identifier: &GroupV2Identifier,
) -> Result<bool, GroupError> {
    let Some(group) = get_group(&*session, owned, identifier)? else {
        return Ok(false);
    };
    versioned::delete_all(session, &group)?;
    let prefix = group_key(owned, identifier);
    session.delete_prefix(Table::GroupV2Member, &prefix)?;
    session.delete_prefix(Table::GroupV2PendingMember, &prefix)?;
    server_user_data::reclaim_all_for_owner(
        session,
        owned,
        &ServerUserDataOwner::GroupV2(identifier.clone()),
    )?;
    session.delete_record::<GroupV2Row>(&group.key())?;
    info!(group = %identifier, "group deleted");
    session.emit(ChangeEvent::GroupDeleted {
        subject: group.subject_ref(),
    });
    Ok(true)
}

/// Delete every group of an owned identity.
pub fn delete_all(session: &mut Session<'_>, owned: &Identity) -> Result<usize, GroupError> {
    let all = groups(&*session, owned)?;
    for group in &all {
        delete_group(session, owned, &group.identifier)?;
    }
    Ok(all.len())
}
