//! Keep-alive bookkeeping for blobs we uploaded to the server.
//!
//! Every photo the local user uploads (owned identity, owned group, or a
//! Group-V2 photo set by us) is registered here with its next refresh time.
//! When the photo is superseded the row is removed and a
//! [`ChangeEvent::ServerUserDataReclaimable`] tells the application it may
//! delete the label server-side.

use serde::{Deserialize, Serialize};
use tracing::debug;
use veil_store::{KeyBuilder, ReadExt, ReadTxn, Record, Session, StoreError, Table, WriteExt};
use veil_types::{ChangeEvent, GroupV2Identifier, Identity, SubjectRef, Timestamp, Uid};

/// What an uploaded blob belongs to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServerUserDataOwner {
    OwnedIdentity,
    GroupV1(Uid),
    GroupV2(GroupV2Identifier),
}

impl ServerUserDataOwner {
    /// Contacts never upload through us, so they have no owner kind.
    pub fn for_subject(subject: &SubjectRef) -> Option<Self> {
        match subject {
            SubjectRef::OwnedIdentity(_) => Some(Self::OwnedIdentity),
            SubjectRef::GroupV1 { group, .. } => Some(Self::GroupV1(group.uid)),
            SubjectRef::GroupV2 { group, .. } => Some(Self::GroupV2(group.clone())),
            SubjectRef::Contact { .. } => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerUserDataRow {
    pub owned: Identity,
    pub label: Uid,
    pub next_refresh: Timestamp,
    pub owner: ServerUserDataOwner,
}

impl Record for ServerUserDataRow {
    const TABLE: Table = Table::ServerUserData;

    fn key(&self) -> Vec<u8> {
        row_key(&self.owned, &self.label)
    }
}

fn row_key(owned: &Identity, label: &Uid) -> Vec<u8> {
    KeyBuilder::new().identity(owned).uid(label).build()
}

fn owned_prefix(owned: &Identity) -> Vec<u8> {
    KeyBuilder::new().identity(owned).build()
}

pub fn register(session: &mut Session<'_>, row: &ServerUserDataRow) -> Result<(), StoreError> {
    debug!(owned = %row.owned, label = ?row.label, "registering server user data");
    session.put_record(row)
}

/// Forget `label` and announce it as reclaimable. The event is emitted even
/// if no row was registered, since the label may still exist server-side.
pub fn reclaim(session: &mut Session<'_>, owned: &Identity, label: &Uid) -> Result<bool, StoreError> {
    let existed = session.delete_record::<ServerUserDataRow>(&row_key(owned, label))?;
    session.emit(ChangeEvent::ServerUserDataReclaimable {
        owned: *owned,
        label: *label,
    });
    Ok(existed)
}

/// Push back the refresh deadline of a registered label.
pub fn refresh(
    session: &mut Session<'_>,
    owned: &Identity,
    label: &Uid,
    next_refresh: Timestamp,
) -> Result<bool, StoreError> {
    let Some(mut row) = session.get_record::<ServerUserDataRow>(&row_key(owned, label))? else {
        return Ok(false);
    };
    row.next_refresh = next_refresh;
    session.put_record(&row)?;
    Ok(true)
}

pub fn get<R: ReadTxn + ?Sized>(
    txn: &R,
    owned: &Identity,
    label: &Uid,
) -> Result<Option<ServerUserDataRow>, StoreError> {
    txn.get_record(&row_key(owned, label))
}

pub fn list<R: ReadTxn + ?Sized>(txn: &R, owned: &Identity) -> Result<Vec<ServerUserDataRow>, StoreError> {
    txn.scan_records(&owned_prefix(owned))
}

/// Rows whose refresh deadline is at or before `now`.
pub fn list_expired<R: ReadTxn + ?Sized>(
    txn: &R,
    owned: &Identity,
    now: Timestamp,
) -> Result<Vec<ServerUserDataRow>, StoreError> {
    Ok(list(txn, owned)?
        .into_iter()
        .filter(|row| row.next_refresh <= now)
        .collect())
}

/// Reclaim every label belonging to `owner`.
pub fn reclaim_all_for_owner(
    session: &mut Session<'_>,
    owned: &Identity,
    owner: &ServerUserDataOwner,
) -> Result<usize, StoreError> {
    let labels: Vec<Uid> = list(&*session, owned)?
        .into_iter()
        .filter(|row| &row.owner == owner)
        .map(|row| row.label)
        .collect();
    for label in &labels {
        reclaim(session, owned, label)?;
    }
    Ok(labels.len())
}

/// Drop every row of an owned identity without announcing anything.
pub fn delete_all(session: &mut Session<'_>, owned: &Identity) -> Result<usize, StoreError> {
    session.delete_prefix(Table::ServerUserData, &owned_prefix(owned))
}

#[cfg(test)]
mod tests {
    use super::*;
    use veil_nullables::NullStore;
    use veil_store::Store;

    fn row(owned: Identity, label: u8, refresh: u64) -> ServerUserDataRow {
        ServerUserDataRow {
            owned,
            label: Uid::new([label; 32]),
            next_refresh: Timestamp::new(refresh),
            owner: ServerUserDataOwner::OwnedIdentity,
        }
    }

    #[test]
    fn expired_rows_are_listed_per_identity() {
        let store = NullStore::new();
        let alice = Identity::new([1u8; 32]);
        let bob = Identity::new([2u8; 32]);
        let mut session = store.begin().unwrap();
        register(&mut session, &row(alice, 1, 100)).unwrap();
        register(&mut session, &row(alice, 2, 500)).unwrap();
        register(&mut session, &row(bob, 3, 100)).unwrap();
        session.commit().unwrap();

        let read = store.read_txn().unwrap();
        let expired = list_expired(&*read, &alice, Timestamp::new(200)).unwrap();
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].label, Uid::new([1u8; 32]));
    }

    #[test]
    fn reclaim_removes_row_and_announces_label() {
        let store = NullStore::new();
        let alice = Identity::new([1u8; 32]);
        let mut session = store.begin().unwrap();
        register(&mut session, &row(alice, 1, 100)).unwrap();
        assert!(reclaim(&mut session, &alice, &Uid::new([1u8; 32])).unwrap());
        let events = session.commit().unwrap();
        assert_eq!(
            events,
            vec![ChangeEvent::ServerUserDataReclaimable {
                owned: alice,
                label: Uid::new([1u8; 32]),
            }]
        );
        assert!(list(&*store.read_txn().unwrap(), &alice).unwrap().is_empty());
    }

    #[test]
    fn refresh_moves_deadline() {
        let store = NullStore::new();
        let alice = Identity::new([1u8; 32]);
        let label = Uid::new([1u8; 32]);
        let mut session = store.begin().unwrap();
        register(&mut session, &row(alice, 1, 100)).unwrap();
        assert!(refresh(&mut session, &alice, &label, Timestamp::new(900)).unwrap());
        assert!(!refresh(&mut session, &alice, &Uid::new([9u8; 32]), Timestamp::new(1)).unwrap());
        assert_eq!(
            get(&session, &alice, &label).unwrap().unwrap().next_refresh,
            Timestamp::new(900)
        );
    }
}
