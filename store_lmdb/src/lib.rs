//! LMDB storage backend for the veil trust core.
//!
//! Implements the `veil-store` transaction traits using the `heed` LMDB
//! bindings. Each [`veil_store::Table`] maps to one named LMDB database
//! within a single environment, and every engine transaction is one LMDB
//! write transaction.

pub mod environment;
pub mod error;
pub mod integrity;
pub mod transaction;

pub use environment::LmdbEnvironment;
pub use error::LmdbError;
pub use integrity::IntegrityReport;
