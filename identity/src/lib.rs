//! Owned identities and the coordinator of the trust engine.
//!
//! The [`IdentityCoordinator`] is what applications talk to: it owns the
//! store, the configuration and the injected services, runs every engine
//! operation in its own transaction and hands committed events to the
//! [`EventBus`].

pub mod config;
pub mod coordinator;
pub mod error;
pub mod event_bus;
pub mod owned;
pub mod photo;

pub use config::EngineConfig;
pub use coordinator::{IdentityCoordinator, SweepReport};
pub use error::IdentityError;
pub use event_bus::EventBus;
pub use owned::{KeycloakBinding, OwnedIdentityRow};
pub use photo::FsPhotoStore;
