//! Server-side photo identity.

use serde::{Deserialize, Serialize};
use veil_types::{Identity, SymmetricKey, Uid};

/// Where a details photo lives on the server: a label and the key that
/// decrypts it. `origin` is the identity that uploaded it, when known.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoSource {
    pub label: Uid,
    pub key: SymmetricKey,
    pub origin: Option<Identity>,
}

impl PhotoSource {
    /// Two sources name the same photo when label and key match; the
    /// uploader does not take part.
    pub fn same_photo_as(&self, other: &PhotoSource) -> bool {
        self.label == other.label && self.key == other.key
    }
}

pub fn same_photo(a: Option<&PhotoSource>, b: Option<&PhotoSource>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => a.same_photo_as(b),
        _ => false,
    }
}
