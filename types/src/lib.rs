//! Fundamental types for the veil trust core.
//!
//! This crate defines the value types shared across every other crate in the
//! workspace: identities, UIDs, timestamps, trust levels, key material, group
//! identifiers and the change events emitted on commit.

pub mod error;
pub mod event;
pub mod group;
pub mod identity;
pub mod keys;
pub mod time;
pub mod trust_level;
pub mod uid;

pub use error::DecodeError;
pub use event::{ChangeEvent, SubjectRef};
pub use group::{GroupOwner, GroupV1Id, GroupV2Category, GroupV2Identifier};
pub use identity::Identity;
pub use keys::{
    EncryptionPrivateKey, EncryptionPublicKey, KeyPair, PrivateKey, Seed, ServerAuthPrivateKey,
    Signature, SymmetricKey,
};
pub use time::{Clock, SystemClock, Timestamp};
pub use trust_level::TrustLevel;
pub use uid::Uid;
