use thiserror::Error;

/// Failure to decode a value type from its byte or text form.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("invalid length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("unknown key tag: {0:#04x}")]
    UnknownTag(u8),

    #[error("invalid hex: {0}")]
    InvalidHex(String),

    #[error("invalid trust level: {0}")]
    InvalidTrustLevel(String),

    #[error("invalid group category: {0}")]
    InvalidCategory(u8),
}
