//! Owned identity rows.

use serde::{Deserialize, Serialize};
use veil_crypto::keypair_from_seed;
use veil_details::DetailsSubject;
use veil_store::{KeyBuilder, ReadExt, ReadTxn, Record, StoreError, Table};
use veil_types::{Identity, KeyPair, Seed, SubjectRef, Timestamp};

/// Binding of an owned identity to the identity server that certifies it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeycloakBinding {
    pub server_url: String,
    pub client_id: String,
    /// Our user id on the identity server.
    pub user_id: Option<String>,
    /// Serialized JSON web key set the server signs details with.
    pub signature_keys: Option<String>,
    pub bound: Timestamp,
}

/// An identity of the local user.
///
/// Owned details have no trusted version: the second pointer is the latest
/// version, a draft whenever it differs from the published one.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnedIdentityRow {
    pub identity: Identity,
    pub signing_seed: Seed,
    pub published_details_version: i32,
    pub latest_details_version: i32,
    pub active: bool,
    pub keycloak: Option<KeycloakBinding>,
    pub created: Timestamp,
}

impl OwnedIdentityRow {
    pub fn keypair(&self) -> KeyPair {
        keypair_from_seed(&self.signing_seed.0)
    }

    pub fn is_keycloak_managed(&self) -> bool {
        self.keycloak.is_some()
    }
}

fn identity_key(identity: &Identity) -> Vec<u8> {
    KeyBuilder::new().identity(identity).build()
}

impl Record for OwnedIdentityRow {
    const TABLE: Table = Table::OwnedIdentity;

    fn key(&self) -> Vec<u8> {
        identity_key(&self.identity)
    }
}

impl DetailsSubject for OwnedIdentityRow {
    const DETAILS_TABLE: Table = Table::OwnedIdentityDetails;

    fn details_prefix(&self) -> Vec<u8> {
        self.key()
    }

    fn subject_ref(&self) -> SubjectRef {
        SubjectRef::OwnedIdentity(self.identity)
    }

    fn published_version(&self) -> i32 {
        self.published_details_version
    }

    fn trusted_version(&self) -> i32 {
        self.latest_details_version
    }

    fn set_versions(&mut self, published: i32, trusted: i32) {
        self.published_details_version = published;
        self.latest_details_version = trusted;
    }
}

pub fn get_owned_identity<R: ReadTxn + ?Sized>(
    txn: &R,
    identity: &Identity,
) -> Result<Option<OwnedIdentityRow>, StoreError> {
    txn.get_record(&identity_key(identity))
}

pub fn owned_identities<R: ReadTxn + ?Sized>(txn: &R) -> Result<Vec<OwnedIdentityRow>, StoreError> {
    txn.scan_records(&[])
}

#[cfg(test)]
mod tests {
    use super::*;
    use veil_nullables::NullStore;
    use veil_store::{Store, WriteExt};

    fn row(seed: u8) -> OwnedIdentityRow {
        let keys = keypair_from_seed(&[seed; 32]);
        OwnedIdentityRow {
            identity: keys.public,
            signing_seed: Seed([seed; 32]),
            published_details_version: 0,
            latest_details_version: 0,
            active: true,
            keycloak: None,
            created: Timestamp::new(1),
        }
    }

    #[test]
    fn keypair_is_rebuilt_from_the_stored_seed() {
        let row = row(7);
        assert_eq!(row.keypair().public, row.identity);
    }

    #[test]
    fn rows_are_listed_in_key_order() {
        let store = NullStore::new();
        let mut session = store.begin().unwrap();
        let (a, b) = (row(1), row(2));
        session.put_record(&a).unwrap();
        session.put_record(&b).unwrap();
        session.commit().unwrap();

        let read = store.read_txn().unwrap();
        assert_eq!(owned_identities(&*read).unwrap().len(), 2);
        assert_eq!(get_owned_identity(&*read, &a.identity).unwrap(), Some(a));
        assert_eq!(get_owned_identity(&*read, &Identity::new([0; 32])).unwrap(), None);
    }
}
