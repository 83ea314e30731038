//! Append-only chain of administrator sets.
//!
//! Each block lists the administrators from that point on, links to the hash
//! of its predecessor and is signed by an administrator of the predecessor
//! (the genesis block by one of its own administrators). The group uid is
//! the hash of the genesis block, so a chain cannot be moved to another
//! group.

use serde::{Deserialize, Serialize};
use veil_crypto::{blake2b_256_multi, sign_message, verify_signature};
use veil_types::{Identity, KeyPair, Signature, Uid};

use crate::ChainError;

const DOMAIN: &[u8] = b"veil/administrators-chain/v1";
const GENESIS_PREVIOUS: [u8; 32] = [0u8; 32];

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdministratorsBlock {
    pub previous: [u8; 32],
    /// Sorted, without duplicates.
    pub administrators: Vec<Identity>,
    pub signer: Identity,
    pub signature: Signature,
}

impl AdministratorsBlock {
    fn signed_content(previous: &[u8; 32], administrators: &[Identity], signer: &Identity) -> Vec<u8> {
        let mut out = Vec::with_capacity(DOMAIN.len() + 32 + 4 + 32 * (administrators.len() + 1));
        out.extend_from_slice(DOMAIN);
        out.extend_from_slice(previous);
        out.extend_from_slice(&(administrators.len() as u32).to_be_bytes());
        for admin in administrators {
            out.extend_from_slice(admin.as_bytes());
        }
        out.extend_from_slice(signer.as_bytes());
        out
    }

    fn sign(
        previous: [u8; 32],
        mut administrators: Vec<Identity>,
        signer: &KeyPair,
        index: usize,
    ) -> Result<Self, ChainError> {
        administrators.sort();
        administrators.dedup();
        if administrators.is_empty() {
            return Err(ChainError::NoAdministrators { index });
        }
        let content = Self::signed_content(&previous, &administrators, &signer.public);
        Ok(Self {
            previous,
            signature: sign_message(&content, &signer.private),
            administrators,
            signer: signer.public,
        })
    }

    pub fn hash(&self) -> [u8; 32] {
        let content = Self::signed_content(&self.previous, &self.administrators, &self.signer);
        blake2b_256_multi(&[&content, self.signature.as_bytes()])
    }

    fn has_valid_signature(&self) -> bool {
        let content = Self::signed_content(&self.previous, &self.administrators, &self.signer);
        verify_signature(&content, &self.signature, &self.signer)
    }

    pub fn is_administrator(&self, identity: &Identity) -> bool {
        self.administrators.binary_search(identity).is_ok()
    }
}

/// An administrators chain as received, not yet checked.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdministratorsChain {
    blocks: Vec<AdministratorsBlock>,
}

impl AdministratorsChain {
    /// Start a chain for a new group. The creator is always an
    /// administrator. Returns the chain and the uid of the group it founds.
    pub fn create(creator: &KeyPair, mut administrators: Vec<Identity>) -> Result<(Self, Uid), ChainError> {
        administrators.push(creator.public);
        let genesis = AdministratorsBlock::sign(GENESIS_PREVIOUS, administrators, creator, 0)?;
        let uid = Uid::new(genesis.hash());
        Ok((Self { blocks: vec![genesis] }, uid))
    }

    /// Append a block replacing the administrator set. The signer must be a
    /// current administrator.
    pub fn append(&self, signer: &KeyPair, administrators: Vec<Identity>) -> Result<Self, ChainError> {
        let last = self.blocks.last().ok_or(ChainError::Empty)?;
        let index = self.blocks.len();
        if !last.is_administrator(&signer.public) {
            return Err(ChainError::SignerNotAdministrator { index });
        }
        let block = AdministratorsBlock::sign(last.hash(), administrators, signer, index)?;
        let mut blocks = self.blocks.clone();
        blocks.push(block);
        Ok(Self { blocks })
    }

    pub fn blocks(&self) -> &[AdministratorsBlock] {
        &self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Hash of the genesis block, i.e. the uid of the group this chain
    /// claims to found.
    pub fn genesis_uid(&self) -> Option<Uid> {
        self.blocks.first().map(|genesis| Uid::new(genesis.hash()))
    }

    pub fn encode(&self) -> Result<Vec<u8>, ChainError> {
        bincode::serialize(self).map_err(|e| ChainError::Decode(e.to_string()))
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, ChainError> {
        bincode::deserialize(bytes).map_err(|e| ChainError::Decode(e.to_string()))
    }

    /// Check every link and signature against `group_uid`.
    pub fn verify(self, group_uid: &Uid) -> Result<VerifiedAdministratorsChain, ChainError> {
        if self.genesis_uid().ok_or(ChainError::Empty)? != *group_uid {
            return Err(ChainError::GroupUidMismatch);
        }
        for (index, block) in self.blocks.iter().enumerate() {
            if block.administrators.is_empty() {
                return Err(ChainError::NoAdministrators { index });
            }
            if !block.administrators.windows(2).all(|w| w[0] < w[1]) {
                return Err(ChainError::Decode(format!(
                    "block {index} administrators are not sorted"
                )));
            }
            let (expected_previous, authority) = match index {
                0 => (GENESIS_PREVIOUS, block),
                _ => {
                    let parent = &self.blocks[index - 1];
                    (parent.hash(), parent)
                }
            };
            if block.previous != expected_previous {
                return Err(ChainError::BrokenLink { index });
            }
            if !authority.is_administrator(&block.signer) {
                return Err(ChainError::SignerNotAdministrator { index });
            }
            if !block.has_valid_signature() {
                return Err(ChainError::BadSignature { index });
            }
        }
        Ok(VerifiedAdministratorsChain {
            chain: self,
            group_uid: *group_uid,
        })
    }
}

/// A chain whose every block was checked for `group_uid`. Only
/// [`AdministratorsChain::verify`] builds one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerifiedAdministratorsChain {
    chain: AdministratorsChain,
    group_uid: Uid,
}

impl VerifiedAdministratorsChain {
    pub fn group_uid(&self) -> &Uid {
        &self.group_uid
    }

    /// Administrators according to the last block.
    pub fn administrators(&self) -> &[Identity] {
        self.chain
            .blocks
            .last()
            .map(|block| block.administrators.as_slice())
            .unwrap_or_default()
    }

    pub fn is_administrator(&self, identity: &Identity) -> bool {
        self.administrators().binary_search(identity).is_ok()
    }

    pub fn len(&self) -> usize {
        self.chain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    /// True when `older` is this chain or an ancestor of it.
    pub fn is_prefixed_by(&self, older: &AdministratorsChain) -> bool {
        older.len() <= self.len() && self.chain.blocks[..older.len()] == older.blocks[..]
    }

    pub fn as_chain(&self) -> &AdministratorsChain {
        &self.chain
    }

    pub fn into_chain(self) -> AdministratorsChain {
        self.chain
    }
}
