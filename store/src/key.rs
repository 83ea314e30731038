//! Composite key construction.
//!
//! Variable-length components are length-prefixed and integers are
//! big-endian, so the key of any leading subset of components is a byte
//! prefix of the full key and range scans come back in natural order.

use veil_types::{GroupV1Id, GroupV2Identifier, Identity, Uid};

#[derive(Clone, Debug, Default)]
pub struct KeyBuilder {
    buf: Vec<u8>,
}

impl KeyBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bytes(mut self, b: &[u8]) -> Self {
        self.buf.extend_from_slice(&(b.len() as u32).to_be_bytes());
        self.buf.extend_from_slice(b);
        self
    }

    pub fn str(self, s: &str) -> Self {
        self.bytes(s.as_bytes())
    }

    pub fn identity(mut self, id: &Identity) -> Self {
        self.buf.extend_from_slice(id.as_bytes());
        self
    }

    pub fn uid(mut self, uid: &Uid) -> Self {
        self.buf.extend_from_slice(uid.as_bytes());
        self
    }

    pub fn u8(mut self, v: u8) -> Self {
        self.buf.push(v);
        self
    }

    pub fn u64(mut self, v: u64) -> Self {
        self.buf.extend_from_slice(&v.to_be_bytes());
        self
    }

    /// Signed versions sort correctly once the sign bit is flipped.
    pub fn i32(mut self, v: i32) -> Self {
        self.buf
            .extend_from_slice(&((v as u32) ^ 0x8000_0000).to_be_bytes());
        self
    }

    pub fn group_v1(self, id: &GroupV1Id) -> Self {
        self.identity(&id.owner).uid(&id.uid)
    }

    pub fn group_v2(self, id: &GroupV2Identifier) -> Self {
        self.uid(&id.group_uid)
            .u8(id.category.as_byte())
            .str(&id.server_url)
    }

    pub fn build(self) -> Vec<u8> {
        self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leading_components_form_a_prefix() {
        let owned = Identity::new([1u8; 32]);
        let contact = Identity::new([2u8; 32]);
        let prefix = KeyBuilder::new().identity(&owned).build();
        let full = KeyBuilder::new().identity(&owned).identity(&contact).build();
        assert!(full.starts_with(&prefix));
    }

    #[test]
    fn signed_versions_sort_naturally() {
        let keys: Vec<Vec<u8>> = [-1, 0, 1, 42]
            .iter()
            .map(|v| KeyBuilder::new().i32(*v).build())
            .collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
    }

    #[test]
    fn length_prefix_prevents_ambiguous_strings() {
        let a = KeyBuilder::new().str("ab").str("c").build();
        let b = KeyBuilder::new().str("a").str("bc").build();
        assert_ne!(a, b);
    }
}
