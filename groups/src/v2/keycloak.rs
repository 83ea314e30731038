//! Members of identity-server managed groups.
//!
//! Each member is presented as a token signed by the identity server. The
//! claims carry the member's identity (hex) and its identity details; the
//! signature itself was checked upstream.

use serde_json::Value;
use tracing::warn;
use veil_crypto::ClaimsDecoder;
use veil_types::Identity;

pub const IDENTITY_CLAIM: &str = "identity";
pub const DETAILS_CLAIM: &str = "details";

/// A member extracted from its signed details.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeycloakMemberClaims {
    pub identity: Identity,
    /// Identity details as JSON text.
    pub details: String,
}

/// Extract identity and details from a signed member token. Returns `None`
/// (and logs) when the token or its claims are malformed.
pub fn decode_member(decoder: &dyn ClaimsDecoder, signed_details: &str) -> Option<KeycloakMemberClaims> {
    let Some(claims) = decoder.decode_unverified(signed_details) else {
        warn!("unreadable keycloak member token");
        return None;
    };
    let identity = claims
        .get(IDENTITY_CLAIM)
        .and_then(Value::as_str)
        .and_then(|hex| Identity::from_hex(hex).ok());
    let Some(identity) = identity else {
        warn!("keycloak member token without a valid identity claim");
        return None;
    };
    let details = match claims.get(DETAILS_CLAIM) {
        Some(details @ Value::Object(_)) => details.to_string(),
        _ => {
            warn!(identity = %identity, "keycloak member token without details");
            return None;
        }
    };
    Some(KeycloakMemberClaims { identity, details })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use veil_nullables::NullClaimsDecoder;

    #[test]
    fn reads_identity_and_details() {
        let alice = Identity::new([7u8; 32]);
        let decoder = NullClaimsDecoder::default();
        decoder.register(
            "alice-token",
            json!({ "identity": alice.to_hex(), "details": { "first_name": "Alice" } }),
        );

        let member = decode_member(&decoder, "alice-token").unwrap();
        assert_eq!(member.identity, alice);
        assert_eq!(member.details, r#"{"first_name":"Alice"}"#);
    }

    #[test]
    fn rejects_tokens_without_identity() {
        let decoder = NullClaimsDecoder::default();
        decoder.register("bad", json!({ "details": {} }));
        decoder.register("short", json!({ "identity": "abcd", "details": {} }));

        assert_eq!(decode_member(&decoder, "bad"), None);
        assert_eq!(decode_member(&decoder, "short"), None);
        assert_eq!(decode_member(&decoder, "unknown"), None);
    }
}
