use veil_store::{KeyBuilder, Record, Table};
use veil_types::SubjectRef;

/// Version of the details row that stands in for "no real content yet", and
/// where trusted content is parked when a downgrade frees version numbers.
pub const PLACEHOLDER_VERSION: i32 = -1;

/// A row that owns versioned details: owned identity, contact or group.
///
/// The subject row itself stores the two live pointers; the details rows
/// live in [`DetailsSubject::DETAILS_TABLE`] under
/// [`DetailsSubject::details_prefix`] followed by the version.
pub trait DetailsSubject: Record {
    const DETAILS_TABLE: Table;

    fn details_prefix(&self) -> Vec<u8>;

    fn subject_ref(&self) -> SubjectRef;

    fn published_version(&self) -> i32;

    /// Trusted version for contacts and groups, latest (draft) version for
    /// owned identities and owned groups.
    fn trusted_version(&self) -> i32;

    fn set_versions(&mut self, published: i32, trusted: i32);

    fn has_draft(&self) -> bool {
        self.published_version() != self.trusted_version()
    }
}

pub(crate) fn details_key<S: DetailsSubject>(subject: &S, version: i32) -> Vec<u8> {
    let mut key = subject.details_prefix();
    key.extend_from_slice(&KeyBuilder::new().i32(version).build());
    key
}
