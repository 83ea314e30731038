use thiserror::Error;
use veil_contacts::ContactError;
use veil_crypto::CryptoError;
use veil_store::StoreError;

#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("invalid device operation: {0}")]
    Validation(String),

    #[error("operation not allowed: {0}")]
    Precondition(String),

    #[error("contact error: {0}")]
    Contact(#[from] ContactError),

    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}
