//! Contacts of an owned identity and why they are trusted.
//!
//! Every contact carries an append-only list of [`TrustOrigin`]s. Each
//! origin contributes a [`TrustLevel`](veil_types::TrustLevel) computed once,
//! when it is recorded, and the contact's stored level is the maximum of
//! those contributions: it never goes down.

pub mod contact;
pub mod error;
pub mod ledger;
pub mod origin;
pub mod policy;
pub mod row;

pub use error::ContactError;
pub use origin::{TrustOrigin, TrustOriginKind, TrustOriginRow};
pub use policy::TrustLevelPolicy;
pub use row::{contact_key, ContactRow};
