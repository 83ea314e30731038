//! Contact lifecycle and status flags.

use tracing::{debug, info};
use veil_details::versioned::{self, DetailsUpdate};
use veil_details::{
    decode_payload, DetailsSubject, IdentityDetails, IncomingDetails, PLACEHOLDER_VERSION,
};
use veil_store::{KeyBuilder, PhotoStore, ReadExt, ReadTxn, Session, StoreError, Table, WriteExt};
use veil_types::{ChangeEvent, Identity, TrustLevel};

use crate::ledger::record_origin;
use crate::{contact_key, ContactError, ContactRow, TrustLevelPolicy, TrustOrigin};

pub fn get_contact<R: ReadTxn + ?Sized>(
    txn: &R,
    owned: &Identity,
    contact: &Identity,
) -> Result<Option<ContactRow>, StoreError> {
    txn.get_record(&contact_key(owned, contact))
}

pub fn require_contact<R: ReadTxn + ?Sized>(
    txn: &R,
    owned: &Identity,
    contact: &Identity,
) -> Result<ContactRow, ContactError> {
    get_contact(txn, owned, contact)?.ok_or(ContactError::NotFound {
        owned: *owned,
        contact: *contact,
    })
}

pub fn contacts<R: ReadTxn + ?Sized>(txn: &R, owned: &Identity) -> Result<Vec<ContactRow>, StoreError> {
    txn.scan_records(&KeyBuilder::new().identity(owned).build())
}

/// Create a contact with its first trust origin.
///
/// The details are stored at the placeholder version until the contact's
/// own published details arrive.
pub fn create_contact(
    session: &mut Session<'_>,
    policy: &TrustLevelPolicy,
    owned: &Identity,
    contact: &Identity,
    details: &str,
    origin: TrustOrigin,
    one_to_one: bool,
) -> Result<ContactRow, ContactError> {
    if owned == contact {
        return Err(ContactError::Validation(
            "an identity cannot be its own contact".into(),
        ));
    }
    let parsed: IdentityDetails = decode_payload(details)?;
    if !parsed.has_name() {
        return Err(ContactError::Validation("contact details have no name".into()));
    }
    if get_contact(&*session, owned, contact)?.is_some() {
        return Err(ContactError::Validation(format!(
            "{contact} is already a contact"
        )));
    }

    let mut row = ContactRow {
        owned: *owned,
        contact: *contact,
        published_details_version: PLACEHOLDER_VERSION,
        trusted_details_version: PLACEHOLDER_VERSION,
        trust_level: TrustLevel::ZERO,
        one_to_one,
        active: true,
        revoked_as_compromised: false,
        certified_by_own_keycloak: false,
        added: origin.timestamp,
    };
    versioned::create_initial(session, &mut row, PLACEHOLDER_VERSION, details, None)?;
    record_origin(session, policy, &mut row, origin)?;
    info!(owned = %owned, contact = %contact, level = %row.trust_level, "contact created");
    session.emit(ChangeEvent::ContactAdded {
        owned: *owned,
        contact: *contact,
    });
    Ok(row)
}

/// Record `origin` for an existing contact, or create the contact from
/// `details` when there is none yet.
pub fn create_or_add_origin(
    session: &mut Session<'_>,
    policy: &TrustLevelPolicy,
    owned: &Identity,
    contact: &Identity,
    details: &str,
    origin: TrustOrigin,
) -> Result<ContactRow, ContactError> {
    match get_contact(&*session, owned, contact)? {
        Some(mut row) => {
            record_origin(session, policy, &mut row, origin)?;
            Ok(row)
        }
        None => create_contact(session, policy, owned, contact, details, origin, false),
    }
}

fn update_flag(
    session: &mut Session<'_>,
    owned: &Identity,
    contact: &Identity,
    apply: impl FnOnce(&mut ContactRow) -> bool,
) -> Result<Option<ContactRow>, ContactError> {
    let mut row = require_contact(&*session, owned, contact)?;
    if !apply(&mut row) {
        return Ok(None);
    }
    session.put_record(&row)?;
    Ok(Some(row))
}

pub fn set_one_to_one(
    session: &mut Session<'_>,
    owned: &Identity,
    contact: &Identity,
    one_to_one: bool,
) -> Result<bool, ContactError> {
    let changed = update_flag(session, owned, contact, |row| {
        std::mem::replace(&mut row.one_to_one, one_to_one) != one_to_one
    })?;
    if changed.is_some() {
        session.emit(ChangeEvent::OneToOneChanged {
            owned: *owned,
            contact: *contact,
            one_to_one,
        });
    }
    Ok(changed.is_some())
}

pub fn set_active(
    session: &mut Session<'_>,
    owned: &Identity,
    contact: &Identity,
    active: bool,
) -> Result<bool, ContactError> {
    let changed = update_flag(session, owned, contact, |row| {
        std::mem::replace(&mut row.active, active) != active
    })?;
    if let Some(row) = &changed {
        session.emit(ChangeEvent::ActiveStatusChanged {
            subject: row.subject_ref(),
            active,
        });
    }
    Ok(changed.is_some())
}

/// Mark the contact's key as compromised. A revoked contact is inactive.
pub fn revoke(session: &mut Session<'_>, owned: &Identity, contact: &Identity) -> Result<bool, ContactError> {
    let changed = update_flag(session, owned, contact, |row| {
        let changed = !row.revoked_as_compromised || row.active;
        row.revoked_as_compromised = true;
        row.active = false;
        changed
    })?;
    let Some(row) = changed else {
        debug!(contact = %contact, "contact already revoked");
        return Ok(false);
    };
    info!(owned = %owned, contact = %contact, "contact revoked as compromised");
    let subject = row.subject_ref();
    session.emit(ChangeEvent::Revoked {
        subject: subject.clone(),
    });
    session.emit(ChangeEvent::ActiveStatusChanged {
        subject,
        active: false,
    });
    Ok(true)
}

pub fn set_certified_by_own_keycloak(
    session: &mut Session<'_>,
    owned: &Identity,
    contact: &Identity,
    certified: bool,
) -> Result<bool, ContactError> {
    Ok(update_flag(session, owned, contact, |row| {
        std::mem::replace(&mut row.certified_by_own_keycloak, certified) != certified
    })?
    .is_some())
}

/// Delete a contact with its details, trust origins and devices.
pub fn delete_contact(
    session: &mut Session<'_>,
    owned: &Identity,
    contact: &Identity,
) -> Result<(), ContactError> {
    let row = require_contact(&*session, owned, contact)?;
    let key = contact_key(owned, contact);
    versioned::delete_all(session, &row)?;
    session.delete_prefix(Table::ContactTrustOrigin, &key)?;
    session.delete_prefix(Table::ContactDevice, &key)?;
    session.delete_record::<ContactRow>(&key)?;
    info!(owned = %owned, contact = %contact, "contact deleted");
    session.emit(ChangeEvent::ContactDeleted {
        owned: *owned,
        contact: *contact,
    });
    Ok(())
}

pub fn update_published_details(
    session: &mut Session<'_>,
    owned: &Identity,
    contact: &Identity,
    incoming: IncomingDetails,
    allow_downgrade: bool,
) -> Result<DetailsUpdate, ContactError> {
    let mut row = require_contact(&*session, owned, contact)?;
    Ok(versioned::update_published(session, &mut row, incoming, allow_downgrade)?)
}

pub fn trust_published_details(
    session: &mut Session<'_>,
    owned: &Identity,
    contact: &Identity,
) -> Result<bool, ContactError> {
    let mut row = require_contact(&*session, owned, contact)?;
    Ok(versioned::trust(session, &mut row)?)
}

pub fn set_downloaded_photo(
    session: &mut Session<'_>,
    photos: &dyn PhotoStore,
    owned: &Identity,
    contact: &Identity,
    version: i32,
    bytes: &[u8],
) -> Result<bool, ContactError> {
    let row = require_contact(&*session, owned, contact)?;
    Ok(versioned::set_downloaded_photo(session, &row, photos, version, bytes)?)
}
