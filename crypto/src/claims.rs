//! Identity-server token claims extraction.
//!
//! Identity-server signed details travel as compact JWS tokens. Signature
//! checking happens upstream; the engine only needs the claims.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde_json::Value;

/// Extracts the claims object of a signed token.
pub trait ClaimsDecoder: Send + Sync {
    /// Returns the claims without verifying the signature, or `None` when the
    /// token is not a well-formed `header.payload.signature` triple carrying a
    /// JSON object.
    fn decode_unverified(&self, token: &str) -> Option<Value>;
}

/// Decoder for compact JWS tokens.
#[derive(Clone, Copy, Debug, Default)]
pub struct JwtClaimsDecoder;

impl ClaimsDecoder for JwtClaimsDecoder {
    fn decode_unverified(&self, token: &str) -> Option<Value> {
        let mut parts = token.split('.');
        let _header = parts.next()?;
        let payload = parts.next()?;
        let _signature = parts.next()?;
        if parts.next().is_some() {
            return None;
        }
        let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
        let value: Value = serde_json::from_slice(&bytes).ok()?;
        value.is_object().then_some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(claims: &str) -> String {
        format!(
            "{}.{}.c2ln",
            URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256"}"#),
            URL_SAFE_NO_PAD.encode(claims.as_bytes())
        )
    }

    #[test]
    fn extracts_claims_object() {
        let claims = JwtClaimsDecoder
            .decode_unverified(&token(r#"{"identity":"ab","firstName":"Ada"}"#))
            .expect("claims");
        assert_eq!(claims["firstName"], "Ada");
    }

    #[test]
    fn rejects_malformed_tokens() {
        assert!(JwtClaimsDecoder.decode_unverified("not-a-token").is_none());
        assert!(JwtClaimsDecoder.decode_unverified("a.b.c.d").is_none());
        assert!(JwtClaimsDecoder.decode_unverified(&token("[1,2]")).is_none());
        assert!(JwtClaimsDecoder.decode_unverified("e30.!!!.c2ln").is_none());
    }
}
