//! Devices of contacts and of owned identities.
//!
//! Both kinds share one model: an optional pre-key (all three fields or
//! none) and a capability set. The pre-key and capability operations are
//! written once over [`DeviceRecord`]; rotation sweeps are driven from the
//! outside through [`get_all_with_expired_pre_key`].

pub mod contact_device;
pub mod error;
pub mod owned_device;
pub mod pre_key;
pub mod record;

pub use contact_device::ContactDeviceRow;
pub use error::DeviceError;
pub use owned_device::OwnedDeviceRow;
pub use pre_key::{PreKey, PreKeyChange};
pub use record::{get_all_with_expired_pre_key, set_capabilities, set_pre_key, DeviceRecord};
