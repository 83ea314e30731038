//! Cryptographic primitives for the veil trust core.
//!
//! - **Ed25519** for administrator-chain signatures (identities are Ed25519 keys)
//! - **Blake2b** for chaining administrator blocks and deriving group uids
//! - **X25519** for device pre-keys
//! - compact JWS claims extraction for identity-server signed details
//! - an [`EntropySource`] seam so tests can replace the OS RNG

pub mod claims;
pub mod entropy;
pub mod error;
pub mod hash;
pub mod keys;
pub mod prekey;
pub mod sign;

pub use claims::{ClaimsDecoder, JwtClaimsDecoder};
pub use entropy::{EntropySource, OsEntropy};
pub use error::CryptoError;
pub use hash::{blake2b_256, blake2b_256_multi, hash_to_uid};
pub use keys::{generate_keypair, keypair_from_seed, public_from_private};
pub use prekey::{generate_pre_key_pair, pre_key_public_from_private};
pub use sign::{sign_message, verify_signature};
