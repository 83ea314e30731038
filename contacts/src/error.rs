use thiserror::Error;
use veil_details::DetailsError;
use veil_store::StoreError;
use veil_types::Identity;

#[derive(Debug, Error)]
pub enum ContactError {
    #[error("invalid contact operation: {0}")]
    Validation(String),

    #[error("operation not allowed: {0}")]
    Precondition(String),

    #[error("contact {contact} of {owned} not found")]
    NotFound { owned: Identity, contact: Identity },

    #[error("details error: {0}")]
    Details(#[from] DetailsError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}
