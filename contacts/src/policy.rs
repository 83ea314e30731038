use serde::{Deserialize, Serialize};
use veil_types::TrustLevel;

/// Trust contributed by each origin kind.
///
/// Introductions and groups are not listed: they contribute
/// `(0, mediator major)`, derived from the mediator's own level.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrustLevelPolicy {
    pub direct: TrustLevel,
    pub identity_server: TrustLevel,
    pub server_group_v2: TrustLevel,
}

impl Default for TrustLevelPolicy {
    fn default() -> Self {
        Self {
            direct: TrustLevel::new(4, 0),
            identity_server: TrustLevel::new(3, 0),
            server_group_v2: TrustLevel::new(2, 0),
        }
    }
}

impl TrustLevelPolicy {
    pub fn mediated(mediator: TrustLevel) -> TrustLevel {
        TrustLevel::new(0, mediator.major)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_rank_direct_highest() {
        let policy = TrustLevelPolicy::default();
        assert!(policy.direct > policy.identity_server);
        assert!(policy.identity_server > policy.server_group_v2);
        assert!(policy.server_group_v2 > TrustLevelPolicy::mediated(policy.direct));
    }
}
