use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend failed or refused the operation.
    #[error("storage backend: {0}")]
    Backend(String),

    /// A row could not be encoded for writing.
    #[error("row encoding: {0}")]
    Serialization(String),

    /// A stored row no longer decodes into its row type.
    #[error("corrupted row: {0}")]
    Corruption(String),
}
