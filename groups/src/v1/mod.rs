//! Legacy groups.
//!
//! The owner decides membership and details. Members follow the owner's
//! published details through the usual published / trusted pair and copy
//! the owner's members version.

pub mod engine;
pub mod row;

pub use row::{GroupV1MemberRow, GroupV1PendingMemberRow, GroupV1Row};
