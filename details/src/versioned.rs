//! The published / trusted-or-latest / draft state machine.
//!
//! Every operation takes the [`Session`] it runs in and the subject row,
//! updates the subject's pointers in place and persists it, and finishes by
//! collecting every version that is neither published nor trusted.

use tracing::{debug, info};
use veil_crypto::EntropySource;
use veil_store::{decode, PhotoStore, ReadExt, ReadTxn, RowWriter, Session, WriteExt};
use veil_types::{ChangeEvent, SubjectRef, Timestamp};

use crate::payload::{parse_payload, same_payload};
use crate::server_user_data::{self, ServerUserDataOwner, ServerUserDataRow};
use crate::subject::details_key;
use crate::{
    same_photo, DetailsError, DetailsRow, DetailsSubject, IncomingDetails, PhotoSource,
    PLACEHOLDER_VERSION,
};

/// Result of [`update_published`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DetailsUpdate {
    /// Not newer than the published version and downgrades are not allowed.
    Stale,
    /// Same content as what is already published.
    Unchanged,
    /// Stored as the new published version. `notified` is false when only
    /// the version number moved.
    Applied { notified: bool },
}

/// Result of [`set_draft`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DraftOutcome {
    Unchanged,
    /// The draft matched the published details and was dropped.
    Discarded,
    Saved { version: i32 },
}

pub fn get_version<R: ReadTxn + ?Sized, S: DetailsSubject>(
    txn: &R,
    subject: &S,
    version: i32,
) -> Result<Option<DetailsRow>, DetailsError> {
    Ok(txn.get_row(S::DETAILS_TABLE, &details_key(subject, version))?)
}

fn require<R: ReadTxn + ?Sized, S: DetailsSubject>(
    txn: &R,
    subject: &S,
    version: i32,
) -> Result<DetailsRow, DetailsError> {
    get_version(txn, subject, version)?.ok_or(DetailsError::MissingVersion { version })
}

pub fn published<R: ReadTxn + ?Sized, S: DetailsSubject>(
    txn: &R,
    subject: &S,
) -> Result<DetailsRow, DetailsError> {
    require(txn, subject, subject.published_version())
}

pub fn trusted<R: ReadTxn + ?Sized, S: DetailsSubject>(
    txn: &R,
    subject: &S,
) -> Result<DetailsRow, DetailsError> {
    require(txn, subject, subject.trusted_version())
}

/// Every stored version of the subject, oldest first.
pub fn versions<R: ReadTxn + ?Sized, S: DetailsSubject>(
    txn: &R,
    subject: &S,
) -> Result<Vec<DetailsRow>, DetailsError> {
    Ok(txn.scan_rows(S::DETAILS_TABLE, &subject.details_prefix())?)
}

/// Live versions whose photo is known server-side but not downloaded yet.
pub fn photos_to_download<R: ReadTxn + ?Sized, S: DetailsSubject>(
    txn: &R,
    subject: &S,
) -> Result<Vec<(i32, PhotoSource)>, DetailsError> {
    Ok(versions(txn, subject)?
        .into_iter()
        .filter(|row| row.photo_url.is_none())
        .filter_map(|row| row.photo_source.map(|source| (row.version, source)))
        .collect())
}

fn write_row<S: DetailsSubject>(
    session: &mut Session<'_>,
    subject: &S,
    row: &DetailsRow,
) -> Result<(), DetailsError> {
    session.put_row(S::DETAILS_TABLE, &details_key(subject, row.version), row)?;
    Ok(())
}

fn save_subject<S: DetailsSubject>(session: &mut Session<'_>, subject: &S) -> Result<(), DetailsError> {
    session.put_record(subject)?;
    Ok(())
}

fn next_version(version: i32) -> Result<i32, DetailsError> {
    version
        .checked_add(1)
        .ok_or_else(|| DetailsError::Validation("details version overflow".into()))
}

/// Drafts exist for the owned identity and for groups we own. Contact
/// details only ever come from the contact.
fn ensure_editable<S: DetailsSubject>(subject: &S) -> Result<(), DetailsError> {
    match subject.subject_ref() {
        SubjectRef::Contact { .. } => Err(DetailsError::Precondition(
            "contact details cannot be edited locally".into(),
        )),
        _ => Ok(()),
    }
}

/// Write the first details row of a new subject and persist the subject
/// with both pointers on it.
pub fn create_initial<S: DetailsSubject>(
    session: &mut Session<'_>,
    subject: &mut S,
    version: i32,
    payload: &str,
    photo_source: Option<PhotoSource>,
) -> Result<DetailsRow, DetailsError> {
    parse_payload(payload)?;
    if !versions(&*session, subject)?.is_empty() {
        return Err(DetailsError::Validation(
            "subject already has details".into(),
        ));
    }
    let row = DetailsRow {
        version,
        payload: payload.to_string(),
        photo_url: None,
        photo_source,
    };
    write_row(session, subject, &row)?;
    subject.set_versions(version, version);
    save_subject(session, subject)?;
    Ok(row)
}

/// Delete every version except the published and trusted ones.
pub fn gc<S: DetailsSubject>(session: &mut Session<'_>, subject: &S) -> Result<usize, DetailsError> {
    let live = [subject.published_version(), subject.trusted_version()];
    let mut removed = 0;
    for (key, bytes) in session.scan_prefix(S::DETAILS_TABLE, &subject.details_prefix())? {
        let row: DetailsRow = decode(&bytes)?;
        if !live.contains(&row.version) {
            session.delete(S::DETAILS_TABLE, &key)?;
            removed += 1;
        }
    }
    if removed > 0 {
        debug!(removed, "collected stale details versions");
    }
    Ok(removed)
}

/// Delete every details row of the subject (cascade on subject deletion).
pub fn delete_all<S: DetailsSubject>(
    session: &mut Session<'_>,
    subject: &S,
) -> Result<usize, DetailsError> {
    Ok(session.delete_prefix(S::DETAILS_TABLE, &subject.details_prefix())?)
}

/// Park the trusted content at the placeholder version and point both
/// pointers at it, freeing every real version number.
fn park_trusted<S: DetailsSubject>(
    session: &mut Session<'_>,
    subject: &mut S,
) -> Result<(), DetailsError> {
    let mut parked = trusted(&*session, subject)?;
    parked.version = PLACEHOLDER_VERSION;
    write_row(session, subject, &parked)?;
    subject.set_versions(PLACEHOLDER_VERSION, PLACEHOLDER_VERSION);
    gc(session, subject)?;
    Ok(())
}

/// Accept published details coming from the outside.
///
/// With `allow_downgrade`, a version that is not newer replaces the
/// published details when its content differs: trusted content is parked at
/// the placeholder version and the incoming details become published.
pub fn update_published<S: DetailsSubject>(
    session: &mut Session<'_>,
    subject: &mut S,
    incoming: IncomingDetails,
    allow_downgrade: bool,
) -> Result<DetailsUpdate, DetailsError> {
    parse_payload(&incoming.payload)?;
    if incoming.version < 0 {
        return Err(DetailsError::Validation(format!(
            "published details version {} is negative",
            incoming.version
        )));
    }
    let current = published(&*session, subject)?;
    let newer = incoming.version > current.version;
    if !newer && !allow_downgrade {
        debug!(
            incoming = incoming.version,
            published = current.version,
            "ignoring stale published details"
        );
        return Ok(DetailsUpdate::Stale);
    }
    let same_content = same_payload(&current.payload, &incoming.payload)?
        && same_photo(current.photo_source.as_ref(), incoming.photo_source.as_ref());
    if !newer && same_content {
        debug!(version = incoming.version, "published details already known");
        return Ok(DetailsUpdate::Unchanged);
    }

    let trusted_follows = newer && same_content && !subject.has_draft();
    if !newer || subject.trusted_version() >= incoming.version {
        info!(
            incoming = incoming.version,
            published = current.version,
            "published details downgrade"
        );
        park_trusted(session, subject)?;
    }

    let mut row = DetailsRow {
        version: incoming.version,
        payload: incoming.payload,
        photo_url: None,
        photo_source: incoming.photo_source,
    };
    if row.photo_source.is_some()
        && same_photo(current.photo_source.as_ref(), row.photo_source.as_ref())
    {
        row.photo_url = current.photo_url.clone();
    }
    write_row(session, subject, &row)?;
    let trusted_version = if trusted_follows {
        row.version
    } else {
        subject.trusted_version()
    };
    subject.set_versions(row.version, trusted_version);
    save_subject(session, subject)?;
    gc(session, subject)?;

    let notified = !same_content;
    if notified {
        session.emit(ChangeEvent::NewPublishedDetails {
            subject: subject.subject_ref(),
        });
    }
    Ok(DetailsUpdate::Applied { notified })
}

/// Accept the published details as trusted. Returns false when they already
/// were.
pub fn trust<S: DetailsSubject>(session: &mut Session<'_>, subject: &mut S) -> Result<bool, DetailsError> {
    if !subject.has_draft() {
        debug!("published details already trusted");
        return Ok(false);
    }
    let row = published(&*session, subject)?;
    subject.set_versions(row.version, row.version);
    save_subject(session, subject)?;
    gc(session, subject)?;
    session.emit(ChangeEvent::DetailsTrusted {
        subject: subject.subject_ref(),
        details: row.payload,
    });
    Ok(true)
}

/// Record a local edit.
///
/// Reverting to exactly the published details discards the draft instead of
/// keeping a copy of them.
pub fn set_draft<S: DetailsSubject>(
    session: &mut Session<'_>,
    subject: &mut S,
    payload: &str,
    photo_url: Option<String>,
) -> Result<DraftOutcome, DetailsError> {
    ensure_editable(subject)?;
    parse_payload(payload)?;
    let latest = trusted(&*session, subject)?;
    if same_payload(&latest.payload, payload)? && latest.photo_url == photo_url {
        return Ok(DraftOutcome::Unchanged);
    }
    let current = published(&*session, subject)?;
    if subject.has_draft()
        && same_payload(&current.payload, payload)?
        && current.photo_url == photo_url
    {
        discard_draft(session, subject)?;
        return Ok(DraftOutcome::Discarded);
    }

    // a kept photo keeps its server identity
    let photo_source = [&latest, &current]
        .into_iter()
        .find(|row| row.photo_url.is_some() && row.photo_url == photo_url)
        .and_then(|row| row.photo_source.clone());
    let version = if subject.has_draft() {
        latest.version
    } else {
        next_version(current.version)?
    };
    let draft = DetailsRow {
        version,
        payload: payload.to_string(),
        photo_url,
        photo_source,
    };
    write_row(session, subject, &draft)?;
    subject.set_versions(current.version, version);
    save_subject(session, subject)?;
    gc(session, subject)?;
    Ok(DraftOutcome::Saved { version })
}

/// Make the draft the published version.
///
/// A new photo gets a fresh server label and key and is registered for
/// keep-alive; a replaced photo of ours is reclaimed. Returns the published
/// row, or `None` when there was nothing to publish.
pub fn publish_draft<S: DetailsSubject>(
    session: &mut Session<'_>,
    subject: &mut S,
    entropy: &dyn EntropySource,
    next_refresh: Timestamp,
) -> Result<Option<DetailsRow>, DetailsError> {
    ensure_editable(subject)?;
    if !subject.has_draft() {
        debug!("no draft to publish");
        return Ok(None);
    }
    let previous = published(&*session, subject)?;
    let mut draft = trusted(&*session, subject)?;
    let subject_ref = subject.subject_ref();
    let owned = *subject_ref.owned_identity();

    if draft.version <= previous.version {
        draft.version = next_version(previous.version)?;
    }
    if draft.photo_url != previous.photo_url {
        if let Some(old) = &previous.photo_source {
            if !matches!(old.origin, Some(origin) if origin != owned) {
                server_user_data::reclaim(session, &owned, &old.label)?;
            }
        }
        if draft.photo_url.is_some() && draft.photo_source.is_none() {
            let source = PhotoSource {
                label: entropy.random_uid()?,
                key: entropy.random_symmetric_key()?,
                origin: Some(owned),
            };
            if let Some(owner) = ServerUserDataOwner::for_subject(&subject_ref) {
                server_user_data::register(
                    session,
                    &ServerUserDataRow {
                        owned,
                        label: source.label,
                        next_refresh,
                        owner,
                    },
                )?;
            }
            draft.photo_source = Some(source);
        }
    }

    write_row(session, subject, &draft)?;
    subject.set_versions(draft.version, draft.version);
    save_subject(session, subject)?;
    gc(session, subject)?;
    info!(version = draft.version, "published details");
    session.emit(ChangeEvent::DetailsPublished {
        subject: subject_ref,
        details: draft.payload.clone(),
    });
    Ok(Some(draft))
}

/// Drop the draft. Returns false when there was none.
pub fn discard_draft<S: DetailsSubject>(
    session: &mut Session<'_>,
    subject: &mut S,
) -> Result<bool, DetailsError> {
    ensure_editable(subject)?;
    if !subject.has_draft() {
        return Ok(false);
    }
    let version = subject.published_version();
    subject.set_versions(version, version);
    save_subject(session, subject)?;
    gc(session, subject)?;
    Ok(true)
}

/// Store downloaded photo bytes and bind them to `version`, and to the other
/// live version too when it names the same server photo.
///
/// Returns false when the version was collected while the photo was being
/// downloaded.
pub fn set_downloaded_photo<S: DetailsSubject>(
    session: &mut Session<'_>,
    subject: &S,
    photos: &dyn PhotoStore,
    version: i32,
    bytes: &[u8],
) -> Result<bool, DetailsError> {
    if bytes.is_empty() {
        return Err(DetailsError::Validation("empty photo".into()));
    }
    let Some(mut row) = get_version(&*session, subject, version)? else {
        debug!(version, "details version gone before its photo arrived");
        return Ok(false);
    };
    let url = photos.write(bytes)?;
    row.photo_url = Some(url.clone());
    write_row(session, subject, &row)?;

    for other in [subject.published_version(), subject.trusted_version()] {
        if other == version {
            continue;
        }
        if let Some(mut sibling) = get_version(&*session, subject, other)? {
            if sibling.photo_url.is_none()
                && sibling.photo_source.is_some()
                && same_photo(sibling.photo_source.as_ref(), row.photo_source.as_ref())
            {
                sibling.photo_url = Some(url.clone());
                write_row(session, subject, &sibling)?;
            }
        }
    }

    session.emit(ChangeEvent::PhotoSet {
        subject: subject.subject_ref(),
        version,
        is_trusted: version == subject.trusted_version(),
    });
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use veil_nullables::{NullEntropy, NullPhotoStore, NullStore};
    use veil_store::{KeyBuilder, Record, Store, Table};
    use veil_types::{Identity, SymmetricKey, Uid};

    #[derive(Clone, Debug, Serialize, Deserialize)]
    struct Subject {
        owned: Identity,
        contact: Option<Identity>,
        published: i32,
        trusted: i32,
    }

    impl Record for Subject {
        const TABLE: Table = Table::Contact;

        fn key(&self) -> Vec<u8> {
            let builder = KeyBuilder::new().identity(&self.owned);
            match &self.contact {
                Some(contact) => builder.identity(contact).build(),
                None => builder.build(),
            }
        }
    }

    impl DetailsSubject for Subject {
        const DETAILS_TABLE: Table = Table::ContactDetails;

        fn details_prefix(&self) -> Vec<u8> {
            self.key()
        }

        fn subject_ref(&self) -> SubjectRef {
            match self.contact {
                Some(contact) => SubjectRef::Contact {
                    owned: self.owned,
                    contact,
                },
                None => SubjectRef::OwnedIdentity(self.owned),
            }
        }

        fn published_version(&self) -> i32 {
            self.published
        }

        fn trusted_version(&self) -> i32 {
            self.trusted
        }

        fn set_versions(&mut self, published: i32, trusted: i32) {
            self.published = published;
            self.trusted = trusted;
        }
    }

    const A: &str = r#"{"first_name":"Ada"}"#;
    const B: &str = r#"{"first_name":"Bea"}"#;
    const C: &str = r#"{"first_name":"Cy"}"#;

    fn contact(store: &NullStore, version: i32, payload: &str) -> Subject {
        let mut subject = Subject {
            owned: Identity::new([1u8; 32]),
            contact: Some(Identity::new([2u8; 32])),
            published: 0,
            trusted: 0,
        };
        let mut session = store.begin().unwrap();
        create_initial(&mut session, &mut subject, version, payload, None).unwrap();
        session.commit().unwrap();
        subject
    }

    fn owned(store: &NullStore, payload: &str) -> Subject {
        let mut subject = Subject {
            owned: Identity::new([1u8; 32]),
            contact: None,
            published: 0,
            trusted: 0,
        };
        let mut session = store.begin().unwrap();
        create_initial(&mut session, &mut subject, 0, payload, None).unwrap();
        session.commit().unwrap();
        subject
    }

    fn stored_versions(store: &NullStore, subject: &Subject) -> Vec<i32> {
        let read = store.read_txn().unwrap();
        versions(&*read, subject)
            .unwrap()
            .into_iter()
            .map(|row| row.version)
            .collect()
    }

    fn photo(label: u8) -> PhotoSource {
        PhotoSource {
            label: Uid::new([label; 32]),
            key: SymmetricKey::ChaCha20Poly1305([label; 32]),
            origin: None,
        }
    }

    #[test]
    fn newer_details_keep_trusted_and_notify() {
        let store = NullStore::new();
        let mut subject = contact(&store, 1, A);
        let mut session = store.begin().unwrap();
        let outcome =
            update_published(&mut session, &mut subject, IncomingDetails::new(2, B), false).unwrap();
        assert_eq!(outcome, DetailsUpdate::Applied { notified: true });
        let events = session.commit().unwrap();
        assert!(matches!(events[0], ChangeEvent::NewPublishedDetails { .. }));
        assert_eq!((subject.published, subject.trusted), (2, 1));
        assert_eq!(stored_versions(&store, &subject), vec![1, 2]);
    }

    #[test]
    fn same_content_with_new_version_moves_trust_silently() {
        let store = NullStore::new();
        let mut subject = contact(&store, 1, A);
        let mut session = store.begin().unwrap();
        let outcome =
            update_published(&mut session, &mut subject, IncomingDetails::new(4, A), false).unwrap();
        assert_eq!(outcome, DetailsUpdate::Applied { notified: false });
        assert!(session.commit().unwrap().is_empty());
        assert_eq!((subject.published, subject.trusted), (4, 4));
        assert_eq!(stored_versions(&store, &subject), vec![4]);
    }

    #[test]
    fn stale_version_is_ignored_without_downgrade() {
        let store = NullStore::new();
        let mut subject = contact(&store, 5, A);
        let mut session = store.begin().unwrap();
        let outcome =
            update_published(&mut session, &mut subject, IncomingDetails::new(3, B), false).unwrap();
        assert_eq!(outcome, DetailsUpdate::Stale);
        assert!(session.commit().unwrap().is_empty());
        assert_eq!((subject.published, subject.trusted), (5, 5));
    }

    #[test]
    fn redelivered_older_identical_details_are_a_no_op() {
        let store = NullStore::new();
        let mut subject = contact(&store, 5, A);
        let mut session = store.begin().unwrap();
        let outcome =
            update_published(&mut session, &mut subject, IncomingDetails::new(3, A), true).unwrap();
        assert_eq!(outcome, DetailsUpdate::Unchanged);
        assert!(session.commit().unwrap().is_empty());
        assert_eq!((subject.published, subject.trusted), (5, 5));
        assert_eq!(stored_versions(&store, &subject), vec![5]);
    }

    #[test]
    fn downgrade_parks_trusted_content_at_placeholder() {
        let store = NullStore::new();
        let mut subject = contact(&store, 5, A);
        let mut session = store.begin().unwrap();
        let outcome =
            update_published(&mut session, &mut subject, IncomingDetails::new(5, B), true).unwrap();
        assert_eq!(outcome, DetailsUpdate::Applied { notified: true });
        assert_eq!((subject.published, subject.trusted), (5, PLACEHOLDER_VERSION));
        assert_eq!(trusted(&session, &subject).unwrap().payload, A);
        assert_eq!(published(&session, &subject).unwrap().payload, B);
        session.commit().unwrap();
        assert_eq!(stored_versions(&store, &subject), vec![PLACEHOLDER_VERSION, 5]);
    }

    #[test]
    fn unchanged_photo_identity_carries_the_downloaded_file() {
        let store = NullStore::new();
        let photos = NullPhotoStore::new();
        let mut subject = contact(&store, 0, A);
        let mut session = store.begin().unwrap();
        update_published(
            &mut session,
            &mut subject,
            IncomingDetails::new(1, A).with_photo(photo(7)),
            false,
        )
        .unwrap();
        assert!(set_downloaded_photo(&mut session, &subject, &photos, 1, b"jpeg").unwrap());
        update_published(
            &mut session,
            &mut subject,
            IncomingDetails::new(2, B).with_photo(photo(7)),
            false,
        )
        .unwrap();
        let row = published(&session, &subject).unwrap();
        assert_eq!(row.photo_url.as_deref(), Some("photo-0"));
    }

    #[test]
    fn trust_moves_pointer_and_announces_payload() {
        let store = NullStore::new();
        let mut subject = contact(&store, 1, A);
        let mut session = store.begin().unwrap();
        update_published(&mut session, &mut subject, IncomingDetails::new(2, B), false).unwrap();
        assert!(trust(&mut session, &mut subject).unwrap());
        assert!(!trust(&mut session, &mut subject).unwrap());
        let events = session.commit().unwrap();
        assert!(events.contains(&ChangeEvent::DetailsTrusted {
            subject: subject.subject_ref(),
            details: B.to_string(),
        }));
        assert_eq!(stored_versions(&store, &subject), vec![2]);
    }

    #[test]
    fn reverting_a_draft_discards_it() {
        let store = NullStore::new();
        let mut subject = owned(&store, A);
        let mut session = store.begin().unwrap();
        assert_eq!(
            set_draft(&mut session, &mut subject, B, None).unwrap(),
            DraftOutcome::Saved { version: 1 }
        );
        assert_eq!(
            set_draft(&mut session, &mut subject, C, None).unwrap(),
            DraftOutcome::Saved { version: 1 }
        );
        assert_eq!(
            set_draft(&mut session, &mut subject, A, None).unwrap(),
            DraftOutcome::Discarded
        );
        assert_eq!(subject.published, subject.trusted);
        session.commit().unwrap();
        assert_eq!(stored_versions(&store, &subject), vec![0]);
    }

    #[test]
    fn contacts_have_no_drafts() {
        let store = NullStore::new();
        let mut subject = contact(&store, 1, A);
        let mut session = store.begin().unwrap();
        assert!(matches!(
            set_draft(&mut session, &mut subject, B, None),
            Err(DetailsError::Precondition(_))
        ));
    }

    #[test]
    fn publishing_a_new_photo_registers_it_and_reclaims_the_old_one() {
        let store = NullStore::new();
        let entropy = NullEntropy::counting();
        let mut subject = owned(&store, A);
        let mut session = store.begin().unwrap();

        set_draft(&mut session, &mut subject, A, Some("local-1".into())).unwrap();
        let first = publish_draft(&mut session, &mut subject, &entropy, Timestamp::new(10))
            .unwrap()
            .unwrap();
        let first_label = first.photo_source.as_ref().unwrap().label;

        set_draft(&mut session, &mut subject, A, Some("local-2".into())).unwrap();
        let second = publish_draft(&mut session, &mut subject, &entropy, Timestamp::new(10))
            .unwrap()
            .unwrap();
        assert_eq!(second.version, 2);
        assert!(publish_draft(&mut session, &mut subject, &entropy, Timestamp::new(10))
            .unwrap()
            .is_none());

        let registered = server_user_data::list(&session, &subject.owned).unwrap();
        assert_eq!(registered.len(), 1);
        assert_eq!(registered[0].label, second.photo_source.unwrap().label);

        let events = session.commit().unwrap();
        assert!(events.contains(&ChangeEvent::ServerUserDataReclaimable {
            owned: subject.owned,
            label: first_label,
        }));
    }

    #[test]
    fn downloaded_photo_is_shared_by_both_live_versions() {
        let store = NullStore::new();
        let photos = NullPhotoStore::new();
        let mut subject = contact(&store, 0, A);
        let mut session = store.begin().unwrap();
        update_published(
            &mut session,
            &mut subject,
            IncomingDetails::new(1, A).with_photo(photo(3)),
            false,
        )
        .unwrap();
        trust(&mut session, &mut subject).unwrap();
        update_published(
            &mut session,
            &mut subject,
            IncomingDetails::new(2, B).with_photo(photo(3)),
            false,
        )
        .unwrap();
        assert_eq!(photos_to_download(&session, &subject).unwrap().len(), 2);

        set_downloaded_photo(&mut session, &subject, &photos, 2, b"png").unwrap();
        assert!(photos_to_download(&session, &subject).unwrap().is_empty());
        let events = session.commit().unwrap();
        assert!(events.contains(&ChangeEvent::PhotoSet {
            subject: subject.subject_ref(),
            version: 2,
            is_trusted: false,
        }));
    }

    #[test]
    fn photo_for_collected_version_is_dropped() {
        let store = NullStore::new();
        let photos = NullPhotoStore::new();
        let subject = contact(&store, 0, A);
        let mut session = store.begin().unwrap();
        assert!(!set_downloaded_photo(&mut session, &subject, &photos, 9, b"png").unwrap());
        assert_eq!(photos.file_count(), 0);
    }
}
