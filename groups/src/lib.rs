//! Group membership engines.
//!
//! - [`v1`]: legacy groups. The owner is the only source of truth for
//!   membership and details; everyone else follows.
//! - [`v2`]: server-backed groups. Membership arrives as an authoritative
//!   server blob guarded by an append-only administrators chain, or, for
//!   keycloak groups, as an identity-server snapshot.

pub mod error;
pub mod v1;
pub mod v2;

pub use error::{ChainError, GroupError};
