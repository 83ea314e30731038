//! Top-level entry point of the engine.
//!
//! Every public operation runs in its own [`Session`]. Events are handed to
//! the [`EventBus`] only after the session committed; an operation that
//! fails anywhere rolls back and publishes nothing.

use std::sync::Arc;

use tracing::{debug, info, warn};
use veil_contacts::contact::{self, create_or_add_origin};
use veil_contacts::{ledger, ContactRow, TrustOrigin, TrustOriginKind, TrustOriginRow};
use veil_crypto::{keypair_from_seed, ClaimsDecoder, EntropySource, JwtClaimsDecoder, OsEntropy};
use veil_details::server_user_data;
use veil_details::versioned::{self, DetailsUpdate, DraftOutcome};
use veil_details::{
    decode_payload, DetailsRow, DetailsSubject, IdentityDetails, IncomingDetails,
    ServerUserDataOwner, ServerUserDataRow,
};
use veil_devices::contact_device::{add_contact_device, get_contact_device, remove_contact_device};
use veil_devices::owned_device::{
    add_owned_device, delete_all_devices, owned_devices, rotate_current_device_pre_key,
};
use veil_devices::{
    get_all_with_expired_pre_key, set_pre_key, ContactDeviceRow, OwnedDeviceRow, PreKey,
    PreKeyChange,
};
use veil_groups::v1::engine as v1;
use veil_groups::v1::GroupV1Row;
use veil_groups::v2::engine as v2;
use veil_groups::v2::{
    pending_members, BlobUpdate, GroupV2Backup, GroupV2Row, KeycloakBlob, NewGroupV2,
    ReconcileOutcome, Schedule,
};
use veil_store::{PhotoStore, ReadTxn, Record, Session, Store, WriteExt};
use veil_types::{
    ChangeEvent, Clock, GroupV1Id, GroupV2Identifier, Identity, SystemClock, Uid,
};

use crate::config::EngineConfig;
use crate::event_bus::EventBus;
use crate::owned::{get_owned_identity, owned_identities, KeycloakBinding, OwnedIdentityRow};
use crate::IdentityError;

/// What one maintenance sweep found and did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Active owned identities visited.
    pub identities: usize,
    /// Current-device pre-keys replaced because they expired.
    pub rotated_pre_keys: usize,
    /// Contact devices whose pre-key expired.
    pub expired_contact_devices: usize,
    /// Uploaded blobs whose keep-alive is due.
    pub server_user_data_due: Vec<ServerUserDataRow>,
}

/// Owns the store and the injected services, and runs every operation of
/// the engine as one transaction.
pub struct IdentityCoordinator<S: Store> {
    store: S,
    config: EngineConfig,
    bus: EventBus,
    clock: Arc<dyn Clock>,
    entropy: Arc<dyn EntropySource>,
    photos: Arc<dyn PhotoStore>,
    claims: Arc<dyn ClaimsDecoder>,
}

fn require_owned<R: ReadTxn + ?Sized>(
    txn: &R,
    identity: &Identity,
) -> Result<OwnedIdentityRow, IdentityError> {
    get_owned_identity(txn, identity)?.ok_or(IdentityError::NotFound(*identity))
}

fn validate_identity_details(payload: &str) -> Result<(), IdentityError> {
    let details: IdentityDetails = decode_payload(payload)?;
    if !details.has_name() {
        return Err(IdentityError::Validation(
            "identity details need a first or last name".into(),
        ));
    }
    Ok(())
}

impl<S: Store> IdentityCoordinator<S> {
    /// A coordinator on the system clock, the OS RNG and the signature-less
    /// claims decoder. Replace any of them with the `with_*` builders.
    pub fn new(store: S, config: EngineConfig, photos: Arc<dyn PhotoStore>) -> Self {
        Self {
            store,
            config,
            bus: EventBus::new(),
            clock: Arc::new(SystemClock),
            entropy: Arc::new(OsEntropy),
            photos,
            claims: Arc::new(JwtClaimsDecoder),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_entropy(mut self, entropy: Arc<dyn EntropySource>) -> Self {
        self.entropy = entropy;
        self
    }

    pub fn with_claims_decoder(mut self, claims: Arc<dyn ClaimsDecoder>) -> Self {
        self.claims = claims;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Register an observer of committed events.
    pub fn subscribe(&mut self, listener: impl Fn(&ChangeEvent) + Send + Sync + 'static) {
        self.bus.subscribe(Box::new(listener));
    }

    fn transact<T>(
        &self,
        op: impl FnOnce(&mut Session<'_>) -> Result<T, IdentityError>,
    ) -> Result<T, IdentityError> {
        let mut session = self.store.begin()?;
        let value = op(&mut session)?;
        let events = session.commit()?;
        if !events.is_empty() {
            debug!(count = events.len(), "publishing committed events");
        }
        self.bus.emit_all(&events);
        Ok(value)
    }

    fn read<T>(
        &self,
        op: impl FnOnce(&dyn ReadTxn) -> Result<T, IdentityError>,
    ) -> Result<T, IdentityError> {
        let txn = self.store.read_txn()?;
        op(&*txn)
    }

    fn schedule(&self) -> Schedule {
        let now = self.clock.now();
        Schedule {
            now,
            next_refresh: now.saturating_add(self.config.server_user_data_refresh_millis),
        }
    }

    // ── Owned identities ───────────────────────────────────────────────

    pub fn owned_identity(&self, identity: &Identity) -> Result<Option<OwnedIdentityRow>, IdentityError> {
        self.read(|txn| Ok(get_owned_identity(txn, identity)?))
    }

    pub fn owned_identities(&self) -> Result<Vec<OwnedIdentityRow>, IdentityError> {
        self.read(|txn| Ok(owned_identities(txn)?))
    }

    /// Generate a new identity with its details at version 0 and a current
    /// device holding a fresh pre-key.
    pub fn create_owned_identity<C: AsRef<str>>(
        &self,
        details: &str,
        device_name: Option<String>,
        capabilities: &[C],
    ) -> Result<OwnedIdentityRow, IdentityError> {
        validate_identity_details(details)?;
        let seed = self.entropy.random_seed()?;
        let identity = keypair_from_seed(&seed.0).public;
        let now = self.clock.now();

        self.transact(|session| {
            if get_owned_identity(&*session, &identity)?.is_some() {
                return Err(IdentityError::Validation(format!(
                    "owned identity {identity} already exists"
                )));
            }
            let mut row = OwnedIdentityRow {
                identity,
                signing_seed: seed,
                published_details_version: 0,
                latest_details_version: 0,
                active: true,
                keycloak: None,
                created: now,
            };
            versioned::create_initial(session, &mut row, 0, details, None)?;
            let device_uid = self.entropy.random_uid()?;
            add_owned_device(session, &identity, device_uid, true, device_name, capabilities)?;
            rotate_current_device_pre_key(
                session,
                self.entropy.as_ref(),
                &identity,
                now,
                self.config.pre_key_validity_millis,
            )?;
            info!(identity = %identity, "owned identity created");
            Ok(row)
        })
    }

    /// Returns false when the identity already was in the requested state.
    pub fn set_active(&self, identity: &Identity, active: bool) -> Result<bool, IdentityError> {
        self.transact(|session| {
            let mut row = require_owned(&*session, identity)?;
            if row.active == active {
                return Ok(false);
            }
            row.active = active;
            session.put_record(&row)?;
            info!(identity = %identity, active, "owned identity status changed");
            session.emit(ChangeEvent::ActiveStatusChanged {
                subject: row.subject_ref(),
                active,
            });
            Ok(true)
        })
    }

    /// Delete an owned identity and everything hanging off it. Photos it
    /// uploaded are announced as reclaimable.
    pub fn delete_owned_identity(&self, identity: &Identity) -> Result<bool, IdentityError> {
        self.transact(|session| {
            let Some(row) = get_owned_identity(&*session, identity)? else {
                return Ok(false);
            };
            v2::delete_all(session, identity)?;
            v1::delete_all(session, identity)?;
            for known in contact::contacts(&*session, identity)? {
                contact::delete_contact(session, identity, &known.contact)?;
            }
            delete_all_devices(session, identity)?;
            server_user_data::reclaim_all_for_owner(
                session,
                identity,
                &ServerUserDataOwner::OwnedIdentity,
            )?;
            server_user_data::delete_all(session, identity)?;
            versioned::delete_all(session, &row)?;
            session.delete_record::<OwnedIdentityRow>(&row.key())?;
            info!(identity = %identity, "owned identity deleted");
            Ok(true)
        })
    }

    // ── Owned details ──────────────────────────────────────────────────

    pub fn owned_published_details(&self, identity: &Identity) -> Result<DetailsRow, IdentityError> {
        self.read(|txn| {
            let row = require_owned(txn, identity)?;
            Ok(versioned::published(txn, &row)?)
        })
    }

    /// The draft when there is one, the published details otherwise.
    pub fn owned_latest_details(&self, identity: &Identity) -> Result<DetailsRow, IdentityError> {
        self.read(|txn| {
            let row = require_owned(txn, identity)?;
            Ok(versioned::trusted(txn, &row)?)
        })
    }

    pub fn set_owned_draft(
        &self,
        identity: &Identity,
        details: &str,
        photo_url: Option<String>,
    ) -> Result<DraftOutcome, IdentityError> {
        validate_identity_details(details)?;
        self.transact(|session| {
            let mut row = require_owned(&*session, identity)?;
            Ok(versioned::set_draft(session, &mut row, details, photo_url)?)
        })
    }

    pub fn publish_owned_draft(&self, identity: &Identity) -> Result<Option<DetailsRow>, IdentityError> {
        let next_refresh = self.schedule().next_refresh;
        self.transact(|session| {
            let mut row = require_owned(&*session, identity)?;
            Ok(versioned::publish_draft(
                session,
                &mut row,
                self.entropy.as_ref(),
                next_refresh,
            )?)
        })
    }

    pub fn discard_owned_draft(&self, identity: &Identity) -> Result<bool, IdentityError> {
        self.transact(|session| {
            let mut row = require_owned(&*session, identity)?;
            Ok(versioned::discard_draft(session, &mut row)?)
        })
    }

    /// Details published by another device of the same identity.
    pub fn update_owned_published_details(
        &self,
        identity: &Identity,
        incoming: IncomingDetails,
    ) -> Result<DetailsUpdate, IdentityError> {
        validate_identity_details(&incoming.payload)?;
        self.transact(|session| {
            let mut row = require_owned(&*session, identity)?;
            Ok(versioned::update_published(session, &mut row, incoming, false)?)
        })
    }

    pub fn set_owned_downloaded_photo(
        &self,
        identity: &Identity,
        version: i32,
        bytes: &[u8],
    ) -> Result<bool, IdentityError> {
        self.transact(|session| {
            let row = require_owned(&*session, identity)?;
            Ok(versioned::set_downloaded_photo(
                session,
                &row,
                self.photos.as_ref(),
                version,
                bytes,
            )?)
        })
    }

    // ── Identity server ────────────────────────────────────────────────

    /// Returns false when the identity already had this exact binding.
    pub fn bind_keycloak(
        &self,
        identity: &Identity,
        binding: KeycloakBinding,
    ) -> Result<bool, IdentityError> {
        self.transact(|session| {
            let mut row = require_owned(&*session, identity)?;
            match &row.keycloak {
                Some(current) if *current == binding => return Ok(false),
                Some(current) if current.server_url != binding.server_url => {
                    return Err(IdentityError::Precondition(format!(
                        "{identity} is bound to {}; unbind it first",
                        current.server_url
                    )));
                }
                _ => {}
            }
            info!(identity = %identity, server = %binding.server_url, "bound to identity server");
            row.keycloak = Some(binding);
            session.put_record(&row)?;
            Ok(true)
        })
    }

    /// Drop the identity-server binding. Contacts lose their certification
    /// and every keycloak group is deleted.
    pub fn unbind_keycloak(&self, identity: &Identity) -> Result<bool, IdentityError> {
        self.transact(|session| {
            let mut row = require_owned(&*session, identity)?;
            let Some(binding) = row.keycloak.take() else {
                return Ok(false);
            };
            session.put_record(&row)?;

            let mut uncertified = 0;
            for known in contact::contacts(&*session, identity)? {
                if contact::set_certified_by_own_keycloak(session, identity, &known.contact, false)? {
                    uncertified += 1;
                }
            }
            let groups = v2::keycloak_groups(&*session, identity)?;
            for group in &groups {
                v2::delete_group(session, identity, &group.identifier)?;
            }
            info!(
                identity = %identity,
                server = %binding.server_url,
                uncertified,
                groups = groups.len(),
                "unbound from identity server"
            );
            Ok(true)
        })
    }

    /// Record that our identity server vouches for `contact`, creating the
    /// contact if needed. Pending memberships of the contact in keycloak
    /// groups are promoted.
    pub fn certify_contact(
        &self,
        owned: &Identity,
        contact_identity: &Identity,
        details: &str,
    ) -> Result<ContactRow, IdentityError> {
        if owned == contact_identity {
            return Err(IdentityError::Validation(
                "an identity cannot certify itself".into(),
            ));
        }
        let now = self.clock.now();
        self.transact(|session| {
            let row = require_owned(&*session, owned)?;
            let Some(binding) = row.keycloak else {
                return Err(IdentityError::Precondition(format!(
                    "{owned} is not bound to an identity server"
                )));
            };
            let origin = TrustOrigin::new(
                now,
                TrustOriginKind::IdentityServer {
                    server: binding.server_url,
                },
            );
            create_or_add_origin(session, &self.config.trust_levels, owned, contact_identity, details, origin)?;
            contact::set_certified_by_own_keycloak(session, owned, contact_identity, true)?;

            for group in v2::keycloak_groups(&*session, owned)? {
                v2::move_pending_member_to_members(
                    session,
                    &self.config.trust_levels,
                    owned,
                    &group.identifier,
                    contact_identity,
                    now,
                )?;
            }
            Ok(contact::require_contact(&*session, owned, contact_identity)?)
        })
    }

    // ── Contacts ───────────────────────────────────────────────────────

    pub fn contact(
        &self,
        owned: &Identity,
        contact_identity: &Identity,
    ) -> Result<Option<ContactRow>, IdentityError> {
        self.read(|txn| Ok(contact::get_contact(txn, owned, contact_identity)?))
    }

    pub fn contacts(&self, owned: &Identity) -> Result<Vec<ContactRow>, IdentityError> {
        self.read(|txn| Ok(contact::contacts(txn, owned)?))
    }

    pub fn trust_origins(
        &self,
        owned: &Identity,
        contact_identity: &Identity,
    ) -> Result<Vec<TrustOriginRow>, IdentityError> {
        self.read(|txn| Ok(ledger::origins(txn, owned, contact_identity)?))
    }

    /// Trust `contact` for one more reason, creating it with `details` when
    /// it is new.
    pub fn add_contact_trust(
        &self,
        owned: &Identity,
        contact_identity: &Identity,
        details: &str,
        kind: TrustOriginKind,
    ) -> Result<ContactRow, IdentityError> {
        if owned == contact_identity {
            return Err(IdentityError::Validation(
                "an identity cannot be its own contact".into(),
            ));
        }
        let origin = TrustOrigin::new(self.clock.now(), kind);
        self.transact(|session| {
            require_owned(&*session, owned)?;
            Ok(create_or_add_origin(
                session,
                &self.config.trust_levels,
                owned,
                contact_identity,
                details,
                origin,
            )?)
        })
    }

    pub fn update_contact_details(
        &self,
        owned: &Identity,
        contact_identity: &Identity,
        incoming: IncomingDetails,
        allow_downgrade: bool,
    ) -> Result<DetailsUpdate, IdentityError> {
        self.transact(|session| {
            Ok(contact::update_published_details(
                session,
                owned,
                contact_identity,
                incoming,
                allow_downgrade,
            )?)
        })
    }

    pub fn trust_contact_details(
        &self,
        owned: &Identity,
        contact_identity: &Identity,
    ) -> Result<bool, IdentityError> {
        self.transact(|session| {
            Ok(contact::trust_published_details(session, owned, contact_identity)?)
        })
    }

    pub fn set_contact_downloaded_photo(
        &self,
        owned: &Identity,
        contact_identity: &Identity,
        version: i32,
        bytes: &[u8],
    ) -> Result<bool, IdentityError> {
        self.transact(|session| {
            Ok(contact::set_downloaded_photo(
                session,
                self.photos.as_ref(),
                owned,
                contact_identity,
                version,
                bytes,
            )?)
        })
    }

    pub fn set_contact_one_to_one(
        &self,
        owned: &Identity,
        contact_identity: &Identity,
        one_to_one: bool,
    ) -> Result<bool, IdentityError> {
        self.transact(|session| {
            Ok(contact::set_one_to_one(session, owned, contact_identity, one_to_one)?)
        })
    }

    pub fn set_contact_active(
        &self,
        owned: &Identity,
        contact_identity: &Identity,
        active: bool,
    ) -> Result<bool, IdentityError> {
        self.transact(|session| Ok(contact::set_active(session, owned, contact_identity, active)?))
    }

    pub fn revoke_contact(&self, owned: &Identity, contact_identity: &Identity) -> Result<bool, IdentityError> {
        self.transact(|session| Ok(contact::revoke(session, owned, contact_identity)?))
    }

    pub fn delete_contact(&self, owned: &Identity, contact_identity: &Identity) -> Result<(), IdentityError> {
        self.transact(|session| Ok(contact::delete_contact(session, owned, contact_identity)?))
    }

    // ── Devices ────────────────────────────────────────────────────────

    pub fn owned_devices(&self, owned: &Identity) -> Result<Vec<OwnedDeviceRow>, IdentityError> {
        self.read(|txn| Ok(owned_devices(txn, owned)?))
    }

    /// Register another device of an owned identity.
    pub fn add_owned_device<C: AsRef<str>>(
        &self,
        owned: &Identity,
        device_uid: Uid,
        display_name: Option<String>,
        capabilities: &[C],
    ) -> Result<OwnedDeviceRow, IdentityError> {
        self.transact(|session| {
            require_owned(&*session, owned)?;
            Ok(add_owned_device(session, owned, device_uid, false, display_name, capabilities)?)
        })
    }

    pub fn add_contact_device<C: AsRef<str>>(
        &self,
        owned: &Identity,
        contact_identity: &Identity,
        device_uid: Uid,
        pre_key: Option<PreKey>,
        capabilities: &[C],
    ) -> Result<ContactDeviceRow, IdentityError> {
        let now = self.clock.now();
        self.transact(|session| {
            Ok(add_contact_device(
                session,
                owned,
                contact_identity,
                device_uid,
                pre_key,
                capabilities,
                now,
            )?)
        })
    }

    pub fn set_contact_device_pre_key(
        &self,
        owned: &Identity,
        contact_identity: &Identity,
        device_uid: &Uid,
        pre_key: Option<PreKey>,
    ) -> Result<PreKeyChange, IdentityError> {
        self.transact(|session| {
            let mut device = get_contact_device(&*session, owned, contact_identity, device_uid)?
                .ok_or_else(|| {
                    IdentityError::Validation(format!("unknown device {device_uid} of {contact_identity}"))
                })?;
            Ok(set_pre_key(session, &mut device, pre_key)?)
        })
    }

    pub fn remove_contact_device(
        &self,
        owned: &Identity,
        contact_identity: &Identity,
        device_uid: &Uid,
    ) -> Result<bool, IdentityError> {
        self.transact(|session| {
            Ok(remove_contact_device(session, owned, contact_identity, device_uid)?)
        })
    }

    // ── Legacy groups ──────────────────────────────────────────────────

    pub fn groups_v1(&self, owned: &Identity) -> Result<Vec<GroupV1Row>, IdentityError> {
        self.read(|txn| Ok(v1::groups(txn, owned)?))
    }

    /// Create a legacy group we own, inviting `pending` with the details we
    /// share for each of them.
    pub fn create_group_v1(
        &self,
        owned: &Identity,
        details: &str,
        pending: Vec<(Identity, String)>,
    ) -> Result<GroupV1Row, IdentityError> {
        let uid = self.entropy.random_uid()?;
        let now = self.clock.now();
        self.transact(|session| {
            require_owned(&*session, owned)?;
            Ok(v1::create_owned_group(session, owned, uid, details, pending, now)?)
        })
    }

    pub fn join_group_v1(
        &self,
        owned: &Identity,
        id: &GroupV1Id,
        details: IncomingDetails,
    ) -> Result<GroupV1Row, IdentityError> {
        let now = self.clock.now();
        self.transact(|session| Ok(v1::create_joined_group(session, owned, id, details, now)?))
    }

    pub fn update_group_v1_details(
        &self,
        owned: &Identity,
        id: &GroupV1Id,
        incoming: IncomingDetails,
    ) -> Result<DetailsUpdate, IdentityError> {
        self.transact(|session| Ok(v1::update_published_details(session, owned, id, incoming)?))
    }

    pub fn trust_group_v1_details(&self, owned: &Identity, id: &GroupV1Id) -> Result<bool, IdentityError> {
        self.transact(|session| Ok(v1::trust_published_details(session, owned, id)?))
    }

    pub fn set_group_v1_draft(
        &self,
        owned: &Identity,
        id: &GroupV1Id,
        details: &str,
        photo_url: Option<String>,
    ) -> Result<DraftOutcome, IdentityError> {
        self.transact(|session| Ok(v1::set_draft(session, owned, id, details, photo_url)?))
    }

    pub fn publish_group_v1_draft(
        &self,
        owned: &Identity,
        id: &GroupV1Id,
    ) -> Result<Option<DetailsRow>, IdentityError> {
        let next_refresh = self.schedule().next_refresh;
        self.transact(|session| {
            Ok(v1::publish_draft(session, self.entropy.as_ref(), owned, id, next_refresh)?)
        })
    }

    pub fn discard_group_v1_draft(&self, owned: &Identity, id: &GroupV1Id) -> Result<bool, IdentityError> {
        self.transact(|session| Ok(v1::discard_draft(session, owned, id)?))
    }

    pub fn set_group_v1_downloaded_photo(
        &self,
        owned: &Identity,
        id: &GroupV1Id,
        version: i32,
        bytes: &[u8],
    ) -> Result<bool, IdentityError> {
        self.transact(|session| {
            Ok(v1::set_downloaded_photo(session, self.photos.as_ref(), owned, id, version, bytes)?)
        })
    }

    pub fn promote_group_v1_member(
        &self,
        owned: &Identity,
        id: &GroupV1Id,
        member: &Identity,
    ) -> Result<bool, IdentityError> {
        let now = self.clock.now();
        self.transact(|session| {
            Ok(v1::move_pending_member_to_members(
                session,
                &self.config.trust_levels,
                owned,
                id,
                member,
                now,
            )?)
        })
    }

    pub fn delete_group_v1(&self, owned: &Identity, id: &GroupV1Id) -> Result<bool, IdentityError> {
        self.transact(|session| Ok(v1::delete_group(session, owned, id)?))
    }

    // ── Server groups ──────────────────────────────────────────────────

    pub fn group_v2(
        &self,
        owned: &Identity,
        identifier: &GroupV2Identifier,
    ) -> Result<Option<GroupV2Row>, IdentityError> {
        self.read(|txn| Ok(v2::get_group(txn, owned, identifier)?))
    }

    pub fn groups_v2(&self, owned: &Identity) -> Result<Vec<GroupV2Row>, IdentityError> {
        self.read(|txn| Ok(v2::groups(txn, owned)?))
    }

    /// Groups waiting for their first confirmed server round-trip.
    pub fn frozen_groups_v2(&self, owned: &Identity) -> Result<Vec<GroupV2Row>, IdentityError> {
        self.read(|txn| Ok(v2::get_all_frozen(txn, owned)?))
    }

    /// Create a server group administered by `owned`.
    pub fn create_group_v2(&self, owned: &Identity, request: NewGroupV2) -> Result<GroupV2Row, IdentityError> {
        let schedule = self.schedule();
        self.transact(|session| {
            let keys = require_owned(&*session, owned)?.keypair();
            Ok(v2::create_new(session, &keys, request, schedule)?)
        })
    }

    /// Join a server group from its first blob. Returns the group and the
    /// members that still have to accept their invitation.
    pub fn join_group_v2(
        &self,
        owned: &Identity,
        identifier: &GroupV2Identifier,
        update: BlobUpdate,
    ) -> Result<(GroupV2Row, Vec<Identity>), IdentityError> {
        let schedule = self.schedule();
        self.transact(|session| {
            require_owned(&*session, owned)?;
            Ok(v2::create_joined(session, owned, identifier, update, schedule)?)
        })
    }

    pub fn restore_group_v2(
        &self,
        owned: &Identity,
        identifier: &GroupV2Identifier,
        backup: GroupV2Backup,
    ) -> Result<GroupV2Row, IdentityError> {
        let schedule = self.schedule();
        self.transact(|session| {
            require_owned(&*session, owned)?;
            Ok(v2::restore_from_backup(session, owned, identifier, backup, schedule)?)
        })
    }

    /// The server acknowledged our latest upload of the group.
    pub fn confirm_group_v2(&self, owned: &Identity, identifier: &GroupV2Identifier) -> Result<bool, IdentityError> {
        self.transact(|session| Ok(v2::set_frozen(session, owned, identifier, false)?))
    }

    /// Merge a new server blob. A blob that no longer lists us removes the
    /// group locally, in the same transaction.
    pub fn reconcile_group_v2(
        &self,
        owned: &Identity,
        identifier: &GroupV2Identifier,
        update: BlobUpdate,
    ) -> Result<ReconcileOutcome, IdentityError> {
        let schedule = self.schedule();
        self.transact(|session| {
            let outcome = v2::reconcile(session, owned, identifier, update, schedule)?;
            match &outcome {
                ReconcileOutcome::SelfRemoved => {
                    info!(group = %identifier, "removed from group");
                    v2::delete_group(session, owned, identifier)?;
                }
                ReconcileOutcome::ChainRejected => {
                    warn!(group = %identifier, "blob rejected: administrators chain does not extend ours");
                }
                _ => {}
            }
            Ok(outcome)
        })
    }

    /// Merge an identity-server snapshot, creating the group on first
    /// sight. Pending members already certified by our identity server are
    /// promoted right away.
    pub fn reconcile_keycloak_group(
        &self,
        owned: &Identity,
        identifier: &GroupV2Identifier,
        blob: KeycloakBlob,
    ) -> Result<ReconcileOutcome, IdentityError> {
        let now = self.clock.now();
        self.transact(|session| {
            let row = require_owned(&*session, owned)?;
            match &row.keycloak {
                Some(binding) if binding.server_url == identifier.server_url => {}
                _ => {
                    return Err(IdentityError::Precondition(format!(
                        "{owned} is not bound to {}",
                        identifier.server_url
                    )))
                }
            }

            let outcome = if v2::get_group(&*session, owned, identifier)?.is_some() {
                v2::reconcile_keycloak(session, self.claims.as_ref(), owned, identifier, blob)?
            } else {
                v2::create_keycloak(session, self.claims.as_ref(), owned, identifier, blob)?;
                ReconcileOutcome::Reconciled(Vec::new())
            };
            match &outcome {
                ReconcileOutcome::SelfRemoved => {
                    info!(group = %identifier, "removed from keycloak group");
                    v2::delete_group(session, owned, identifier)?;
                }
                ReconcileOutcome::Reconciled(_) => {
                    for pending in pending_members(&*session, owned, identifier)? {
                        v2::move_pending_member_to_members(
                            session,
                            &self.config.trust_levels,
                            owned,
                            identifier,
                            &pending.member,
                            now,
                        )?;
                    }
                }
                _ => {}
            }
            Ok(outcome)
        })
    }

    pub fn promote_group_v2_member(
        &self,
        owned: &Identity,
        identifier: &GroupV2Identifier,
        member: &Identity,
    ) -> Result<bool, IdentityError> {
        let now = self.clock.now();
        self.transact(|session| {
            Ok(v2::move_pending_member_to_members(
                session,
                &self.config.trust_levels,
                owned,
                identifier,
                member,
                now,
            )?)
        })
    }

    pub fn trust_group_v2_details(
        &self,
        owned: &Identity,
        identifier: &GroupV2Identifier,
    ) -> Result<bool, IdentityError> {
        self.transact(|session| Ok(v2::trust_details(session, owned, identifier)?))
    }

    pub fn set_group_v2_downloaded_photo(
        &self,
        owned: &Identity,
        identifier: &GroupV2Identifier,
        version: i32,
        bytes: &[u8],
    ) -> Result<bool, IdentityError> {
        self.transact(|session| {
            Ok(v2::set_downloaded_photo(
                session,
                self.photos.as_ref(),
                owned,
                identifier,
                version,
                bytes,
            )?)
        })
    }

    pub fn delete_group_v2(&self, owned: &Identity, identifier: &GroupV2Identifier) -> Result<bool, IdentityError> {
        self.transact(|session| Ok(v2::delete_group(session, owned, identifier)?))
    }

    // ── Maintenance ────────────────────────────────────────────────────

    /// Push back the keep-alive deadline of a blob the application just
    /// refreshed on the server.
    pub fn refresh_server_user_data(&self, owned: &Identity, label: &Uid) -> Result<bool, IdentityError> {
        let next_refresh = self.schedule().next_refresh;
        self.transact(|session| Ok(server_user_data::refresh(session, owned, label, next_refresh)?))
    }

    /// Rotate expired current-device pre-keys and report what else is due,
    /// for every active owned identity. Each identity is swept in its own
    /// transaction.
    pub fn sweep(&self) -> Result<SweepReport, IdentityError> {
        let now = self.clock.now();
        let mut report = SweepReport::default();
        for row in self.owned_identities()?.into_iter().filter(|row| row.active) {
            let identity = row.identity;
            report.identities += 1;

            let rotated = self.transact(|session| {
                let expired =
                    get_all_with_expired_pre_key::<_, OwnedDeviceRow>(&*session, &identity, now)?;
                if !expired.iter().any(|device| device.is_current) {
                    return Ok(false);
                }
                rotate_current_device_pre_key(
                    session,
                    self.entropy.as_ref(),
                    &identity,
                    now,
                    self.config.pre_key_validity_millis,
                )?;
                Ok(true)
            })?;
            if rotated {
                report.rotated_pre_keys += 1;
            }

            let (expired_contact_devices, due) = self.read(|txn| {
                let devices = get_all_with_expired_pre_key::<_, ContactDeviceRow>(txn, &identity, now)?;
                Ok((devices.len(), server_user_data::list_expired(txn, &identity, now)?))
            })?;
            report.expired_contact_devices += expired_contact_devices;
            report.server_user_data_due.extend(due);
        }
        info!(
            identities = report.identities,
            rotated = report.rotated_pre_keys,
            expired_contact_devices = report.expired_contact_devices,
            server_user_data_due = report.server_user_data_due.len(),
            "sweep finished"
        );
        Ok(report)
    }
}
