use thiserror::Error;
use veil_crypto::CryptoError;
use veil_store::StoreError;

#[derive(Debug, Error)]
pub enum DetailsError {
    #[error("invalid details: {0}")]
    Validation(String),

    #[error("operation not allowed: {0}")]
    Precondition(String),

    #[error("details version {version} is missing")]
    MissingVersion { version: i32 },

    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}
