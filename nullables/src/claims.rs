//! Nullable claims decoder: token strings mapped to fixed claims.

use std::collections::HashMap;
use std::sync::Mutex;

use serde_json::Value;
use veil_crypto::ClaimsDecoder;

/// Returns the claims registered for a token, `None` for anything else.
#[derive(Debug, Default)]
pub struct NullClaimsDecoder {
    tokens: Mutex<HashMap<String, Value>>,
}

impl NullClaimsDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, token: impl Into<String>, claims: Value) {
        if let Ok(mut tokens) = self.tokens.lock() {
            tokens.insert(token.into(), claims);
        }
    }
}

impl ClaimsDecoder for NullClaimsDecoder {
    fn decode_unverified(&self, token: &str) -> Option<Value> {
        self.tokens.lock().ok()?.get(token).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unknown_tokens_decode_to_none() {
        let decoder = NullClaimsDecoder::new();
        decoder.register("tok", json!({"firstName": "Ada"}));
        assert_eq!(decoder.decode_unverified("tok").unwrap()["firstName"], "Ada");
        assert!(decoder.decode_unverified("other").is_none());
    }
}
