//! Versioned details for every trust subject.
//!
//! Owned identities, contacts and groups all carry display details in the
//! same three-slot shape: a *published* version (what others see as
//! authoritative), a *trusted-or-latest* version (what the local user
//! accepted, or their own pending draft) and, transiently, a draft. Only the
//! two live versions survive any transition; everything else is collected.
//!
//! The operations in [`versioned`] are written once against the
//! [`DetailsSubject`] trait and reused by every subject type.

pub mod error;
pub mod payload;
pub mod photo;
pub mod row;
pub mod server_user_data;
pub mod subject;
pub mod versioned;

pub use error::DetailsError;
pub use payload::{decode_payload, encode_payload, same_payload, GroupDetails, IdentityDetails};
pub use photo::{same_photo, PhotoSource};
pub use row::{DetailsRow, IncomingDetails};
pub use server_user_data::{ServerUserDataOwner, ServerUserDataRow};
pub use subject::{DetailsSubject, PLACEHOLDER_VERSION};
pub use versioned::{DetailsUpdate, DraftOutcome};
