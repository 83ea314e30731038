//! Decrypted snapshots handed to the reconciliation engine.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use veil_details::IncomingDetails;
use veil_types::{Identity, Seed, ServerAuthPrivateKey, Timestamp};

use crate::v2::admin_chain::VerifiedAdministratorsChain;

pub mod permissions {
    pub const GROUP_ADMIN: &str = "group_admin";
    pub const REMOTE_DELETE_ANYTHING: &str = "remote_delete_anything";
    pub const EDIT_OR_REMOTE_DELETE_OWN_MESSAGES: &str = "edit_or_remote_delete_own_messages";
    pub const CHANGE_SETTINGS: &str = "change_settings";
    pub const SEND_MESSAGE: &str = "send_message";

    pub fn administrator() -> std::collections::BTreeSet<String> {
        [
            GROUP_ADMIN,
            REMOTE_DELETE_ANYTHING,
            EDIT_OR_REMOTE_DELETE_OWN_MESSAGES,
            CHANGE_SETTINGS,
            SEND_MESSAGE,
        ]
        .into_iter()
        .map(str::to_string)
        .collect()
    }
}

/// Keys protecting a group's server blob.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobKeys {
    /// Only members who joined through an invitation hold the main seed.
    pub main_seed: Option<Seed>,
    pub version_seed: Seed,
    /// Held by administrators only.
    pub admin_server_auth_private_key: Option<ServerAuthPrivateKey>,
}

/// One participant as listed in a server blob.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlobMember {
    pub identity: Identity,
    pub permissions: BTreeSet<String>,
    pub invitation_nonce: Vec<u8>,
    /// Serialized identity details the member published in the group.
    pub details: String,
}

/// Authoritative group state fetched from the server.
///
/// The administrators chain is already verified: a blob cannot be built
/// around an unchecked chain.
#[derive(Clone, Debug)]
pub struct ServerBlob {
    pub administrators_chain: VerifiedAdministratorsChain,
    pub version: i32,
    pub members: Vec<BlobMember>,
    pub details: IncomingDetails,
    pub group_type: Option<String>,
}

/// A blob together with the keys it was decrypted with.
#[derive(Clone, Debug)]
pub struct BlobUpdate {
    pub blob: ServerBlob,
    pub keys: BlobKeys,
    pub updated_by_me: bool,
}

/// One participant of a keycloak group: a token signed by the identity
/// server carrying the member's identity and details.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeycloakBlobMember {
    pub signed_details: String,
    pub permissions: BTreeSet<String>,
}

/// Snapshot of a keycloak-managed group.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeycloakBlob {
    pub members: Vec<KeycloakBlobMember>,
    /// Group details payload (always version 0).
    pub details: String,
    pub push_topic: Option<String>,
    pub shared_settings: Option<String>,
    pub last_modification: Timestamp,
}

/// What a restore from backup brings back. Membership is not part of it;
/// it arrives with the first reconciliation once the group is unfrozen.
#[derive(Clone, Debug)]
pub struct GroupV2Backup {
    pub version: i32,
    pub administrators_chain: Option<crate::v2::AdministratorsChain>,
    pub keys: Option<BlobKeys>,
    pub own_permissions: BTreeSet<String>,
    pub details: IncomingDetails,
    pub push_topic: Option<String>,
    pub shared_settings: Option<String>,
}
