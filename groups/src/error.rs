use thiserror::Error;
use veil_contacts::ContactError;
use veil_crypto::CryptoError;
use veil_details::DetailsError;
use veil_store::StoreError;

#[derive(Debug, Error)]
pub enum GroupError {
    #[error("invalid group operation: {0}")]
    Validation(String),

    #[error("operation not allowed: {0}")]
    Precondition(String),

    #[error("group {0} not found")]
    GroupNotFound(String),

    #[error("administrators chain rejected: {0}")]
    Chain(#[from] ChainError),

    #[error("contact error: {0}")]
    Contact(#[from] ContactError),

    #[error("details error: {0}")]
    Details(#[from] DetailsError),

    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Why an administrators chain failed verification.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChainError {
    #[error("chain has no blocks")]
    Empty,

    #[error("chain could not be decoded: {0}")]
    Decode(String),

    #[error("genesis block does not hash to the group uid")]
    GroupUidMismatch,

    #[error("block {index} has no administrators")]
    NoAdministrators { index: usize },

    #[error("block {index} does not link to its predecessor")]
    BrokenLink { index: usize },

    #[error("block {index} has an invalid signature")]
    BadSignature { index: usize },

    #[error("block {index} is signed by a non-administrator")]
    SignerNotAdministrator { index: usize },
}
