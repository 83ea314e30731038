//! Nullable infrastructure for deterministic testing.
//!
//! Every external dependency of the engines (storage, clock, entropy, photo
//! files, identity-server tokens) sits behind a trait. This crate provides
//! test-friendly implementations that:
//! - Return deterministic values
//! - Can be controlled programmatically
//! - Never touch the filesystem or network
//!
//! Usage: swap real implementations for nullables in tests.

pub mod claims;
pub mod clock;
pub mod entropy;
pub mod photo;
pub mod store;

pub use claims::NullClaimsDecoder;
pub use clock::NullClock;
pub use entropy::NullEntropy;
pub use photo::NullPhotoStore;
pub use store::NullStore;
