use proptest::prelude::*;

use veil_types::{
    GroupV2Category, GroupV2Identifier, Identity, SymmetricKey, Timestamp, TrustLevel, Uid,
};

proptest! {
    /// Identity hex encoding roundtrips for every key.
    #[test]
    fn identity_hex_roundtrip(bytes in prop::array::uniform32(0u8..)) {
        let id = Identity::new(bytes);
        prop_assert_eq!(Identity::from_hex(&id.to_hex()).unwrap(), id);
    }

    /// Identity ordering agrees with byte ordering.
    #[test]
    fn identity_ordering_matches_bytes(
        a in prop::array::uniform32(0u8..),
        b in prop::array::uniform32(0u8..),
    ) {
        prop_assert_eq!(Identity::new(a) < Identity::new(b), a < b);
    }

    /// Uid::is_zero is true only for all-zero bytes.
    #[test]
    fn uid_is_zero_correct(bytes in prop::array::uniform32(0u8..)) {
        prop_assert_eq!(Uid::new(bytes).is_zero(), bytes == [0u8; 32]);
    }

    /// TrustLevel ordering is lexicographic on (major, minor).
    #[test]
    fn trust_level_lexicographic(
        a in (0u32..10, 0u32..10),
        b in (0u32..10, 0u32..10),
    ) {
        let la = TrustLevel::new(a.0, a.1);
        let lb = TrustLevel::new(b.0, b.1);
        prop_assert_eq!(la < lb, a < b);
    }

    /// TrustLevel text form parses back to the same level.
    #[test]
    fn trust_level_text_roundtrip(major in 0u32..1000, minor in 0u32..1000) {
        let level = TrustLevel::new(major, minor);
        prop_assert_eq!(level.to_string().parse::<TrustLevel>().unwrap(), level);
    }

    /// Timestamp ordering: new(a) <= new(b) iff a <= b.
    #[test]
    fn timestamp_ordering(a in 0u64..u64::MAX, b in 0u64..u64::MAX) {
        prop_assert_eq!(Timestamp::new(a) <= Timestamp::new(b), a <= b);
    }

    /// Timestamp elapsed_since saturates to 0 when now < self.
    #[test]
    fn timestamp_elapsed_since_saturates(base in 1u64..1_000_000, deficit in 1u64..1_000_000) {
        let later = Timestamp::new(base + deficit);
        prop_assert_eq!(later.elapsed_since(Timestamp::new(base)), 0);
    }

    /// Group identifiers survive their reference byte form.
    #[test]
    fn group_identifier_bytes_roundtrip(
        uid in prop::array::uniform32(0u8..),
        url in "[a-z]{1,12}\\.example",
        keycloak in any::<bool>(),
    ) {
        let category = if keycloak { GroupV2Category::Keycloak } else { GroupV2Category::Server };
        let id = GroupV2Identifier::new(Uid::new(uid), url, category);
        prop_assert_eq!(GroupV2Identifier::from_bytes(&id.to_bytes()).unwrap(), id);
    }

    /// Symmetric keys survive bincode, the format rows are persisted in.
    #[test]
    fn symmetric_key_bincode_roundtrip(bytes in prop::array::uniform32(0u8..)) {
        let key = SymmetricKey::ChaCha20Poly1305(bytes);
        let encoded = bincode::serialize(&key).unwrap();
        let decoded: SymmetricKey = bincode::deserialize(&encoded).unwrap();
        prop_assert_eq!(decoded, key);
    }
}
