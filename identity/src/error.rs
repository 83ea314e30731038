use thiserror::Error;
use veil_contacts::ContactError;
use veil_crypto::CryptoError;
use veil_details::DetailsError;
use veil_devices::DeviceError;
use veil_groups::GroupError;
use veil_store::StoreError;
use veil_types::Identity;

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("invalid identity operation: {0}")]
    Validation(String),

    #[error("operation not allowed: {0}")]
    Precondition(String),

    #[error("owned identity {0} not found")]
    NotFound(Identity),

    #[error("config error: {0}")]
    Config(String),

    #[error("contact error: {0}")]
    Contact(#[from] ContactError),

    #[error("device error: {0}")]
    Device(#[from] DeviceError),

    #[error("group error: {0}")]
    Group(#[from] GroupError),

    #[error("details error: {0}")]
    Details(#[from] DetailsError),

    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}
