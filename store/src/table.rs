//! The persisted tables.

/// One table per entity kind. Keys are composite byte strings built with
/// [`crate::KeyBuilder`]; values are bincode-encoded rows.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Table {
    OwnedIdentity,
    OwnedIdentityDetails,
    OwnedDevice,
    Contact,
    ContactDetails,
    ContactTrustOrigin,
    ContactDevice,
    GroupV1,
    GroupV1Details,
    GroupV1Member,
    GroupV1PendingMember,
    GroupV2,
    GroupV2Details,
    GroupV2Member,
    GroupV2PendingMember,
    ServerUserData,
}

impl Table {
    pub const ALL: [Table; 16] = [
        Table::OwnedIdentity,
        Table::OwnedIdentityDetails,
        Table::OwnedDevice,
        Table::Contact,
        Table::ContactDetails,
        Table::ContactTrustOrigin,
        Table::ContactDevice,
        Table::GroupV1,
        Table::GroupV1Details,
        Table::GroupV1Member,
        Table::GroupV1PendingMember,
        Table::GroupV2,
        Table::GroupV2Details,
        Table::GroupV2Member,
        Table::GroupV2PendingMember,
        Table::ServerUserData,
    ];

    /// Stable name, used as the backend database name.
    pub fn name(&self) -> &'static str {
        match self {
            Table::OwnedIdentity => "owned_identity",
            Table::OwnedIdentityDetails => "owned_identity_details",
            Table::OwnedDevice => "owned_device",
            Table::Contact => "contact",
            Table::ContactDetails => "contact_details",
            Table::ContactTrustOrigin => "contact_trust_origin",
            Table::ContactDevice => "contact_device",
            Table::GroupV1 => "group_v1",
            Table::GroupV1Details => "group_v1_details",
            Table::GroupV1Member => "group_v1_member",
            Table::GroupV1PendingMember => "group_v1_pending_member",
            Table::GroupV2 => "group_v2",
            Table::GroupV2Details => "group_v2_details",
            Table::GroupV2Member => "group_v2_member",
            Table::GroupV2PendingMember => "group_v2_pending_member",
            Table::ServerUserData => "server_user_data",
        }
    }

    pub fn index(&self) -> usize {
        *self as usize
    }
}
