//! Two-component trust levels, compared lexicographically on (major, minor).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::DecodeError;

/// How much a contact is trusted.
///
/// The derived ordering compares `major` first, then `minor`, which is the
/// order used when deciding whether a new trust origin raises a contact's
/// level.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct TrustLevel {
    pub major: u32,
    pub minor: u32,
}

impl TrustLevel {
    pub const ZERO: Self = Self { major: 0, minor: 0 };

    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }
}

impl fmt::Display for TrustLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl FromStr for TrustLevel {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (major, minor) = s
            .split_once('.')
            .ok_or_else(|| DecodeError::InvalidTrustLevel(s.to_string()))?;
        let major = major
            .parse()
            .map_err(|_| DecodeError::InvalidTrustLevel(s.to_string()))?;
        let minor = minor
            .parse()
            .map_err(|_| DecodeError::InvalidTrustLevel(s.to_string()))?;
        Ok(Self { major, minor })
    }
}
