use serde::{Deserialize, Serialize};
use veil_details::DetailsSubject;
use veil_store::{KeyBuilder, Record, Table};
use veil_types::{Identity, SubjectRef, Timestamp, TrustLevel};

/// Key of a contact row. Rows belonging to one contact in other tables
/// (details, origins, devices) start with it.
pub fn contact_key(owned: &Identity, contact: &Identity) -> Vec<u8> {
    KeyBuilder::new().identity(owned).identity(contact).build()
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactRow {
    pub owned: Identity,
    pub contact: Identity,
    pub published_details_version: i32,
    pub trusted_details_version: i32,
    pub trust_level: TrustLevel,
    pub one_to_one: bool,
    pub active: bool,
    pub revoked_as_compromised: bool,
    pub certified_by_own_keycloak: bool,
    pub added: Timestamp,
}

impl Record for ContactRow {
    const TABLE: Table = Table::Contact;

    fn key(&self) -> Vec<u8> {
        contact_key(&self.owned, &self.contact)
    }
}

impl DetailsSubject for ContactRow {
    const DETAILS_TABLE: Table = Table::ContactDetails;

    fn details_prefix(&self) -> Vec<u8> {
        self.key()
    }

    fn subject_ref(&self) -> SubjectRef {
        SubjectRef::Contact {
            owned: self.owned,
            contact: self.contact,
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
