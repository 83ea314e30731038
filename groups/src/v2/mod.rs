//! Server-backed groups.
//!
//! A server group's state is whatever the latest blob on the server says,
//! as long as its administrators chain extends the one we already hold.
//! Keycloak groups follow identity-server snapshots instead and carry no
//! chain.

pub mod admin_chain;
pub mod blob;
pub mod engine;
pub mod keycloak;
pub mod members;
pub mod row;

pub use admin_chain::{AdministratorsBlock, AdministratorsChain, VerifiedAdministratorsChain};
pub use blob::{
    permissions, BlobKeys, BlobMember, BlobUpdate, GroupV2Backup, KeycloakBlob, KeycloakBlobMember,
    ServerBlob,
};
pub use engine::{NewGroupV2, ReconcileOutcome, Schedule};
pub use members::{get_member, get_pending_member, members, pending_members};
pub use row::{GroupV2MemberRow, GroupV2PendingMemberRow, GroupV2Row};
