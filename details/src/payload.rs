//! Detail payloads.
//!
//! Payloads are persisted as JSON text. The engine never interprets them
//! beyond structural equality, so key order and whitespace differences do
//! not count as a change.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::DetailsError;

/// Display details of a person (owned identity or contact).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityDetails {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub company: Option<String>,
    pub position: Option<String>,
    /// Identity-server signed copy of these details, as a compact token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signed_user_details: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub custom_fields: BTreeMap<String, String>,
}

impl IdentityDetails {
    pub fn named(first: &str, last: &str) -> Self {
        Self {
            first_name: Some(first.to_string()),
            last_name: Some(last.to_string()),
            ..Self::default()
        }
    }

    /// A person needs at least a first or a last name.
    pub fn has_name(&self) -> bool {
        let filled = |s: &Option<String>| s.as_deref().is_some_and(|s| !s.trim().is_empty());
        filled(&self.first_name) || filled(&self.last_name)
    }
}

/// Display details of a group.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupDetails {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl GroupDetails {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            description: None,
        }
    }
}

pub fn encode_payload<P: Serialize>(payload: &P) -> Result<String, DetailsError> {
    serde_json::to_string(payload).map_err(|e| DetailsError::Validation(e.to_string()))
}

pub fn decode_payload<P: DeserializeOwned>(payload: &str) -> Result<P, DetailsError> {
    serde_json::from_str(payload).map_err(|e| DetailsError::Validation(e.to_string()))
}

/// Parse a payload, requiring a JSON object.
pub(crate) fn parse_payload(payload: &str) -> Result<Value, DetailsError> {
    let value: Value = decode_payload(payload)?;
    if !value.is_object() {
        return Err(DetailsError::Validation(
            "details payload must be a JSON object".into(),
        ));
    }
    Ok(value)
}

/// Structural equality of two JSON payloads.
pub fn same_payload(a: &str, b: &str) -> Result<bool, DetailsError> {
    if a == b {
        return Ok(true);
    }
    Ok(parse_payload(a)? == parse_payload(b)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_order_is_not_a_change() {
        assert!(same_payload(r#"{"a":1,"b":2}"#, r#"{ "b": 2, "a": 1 }"#).unwrap());
        assert!(!same_payload(r#"{"a":1}"#, r#"{"a":2}"#).unwrap());
    }

    #[test]
    fn non_objects_are_rejected() {
        assert!(matches!(
            same_payload("[1]", "[2]"),
            Err(DetailsError::Validation(_))
        ));
    }

    #[test]
    fn identity_details_roundtrip_through_json() {
        let details = IdentityDetails::named("Ada", "Lovelace");
        let json = encode_payload(&details).unwrap();
        let back: IdentityDetails = decode_payload(&json).unwrap();
        assert_eq!(back, details);
        assert!(back.has_name());
        assert!(!IdentityDetails::default().has_name());
    }
}
