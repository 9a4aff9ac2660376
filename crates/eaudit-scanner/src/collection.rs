//! Decoding of legacy list responses
//!
//! List endpoints wrap their items in a named collection, e.g.
//! `{"policies": [{"id": 1, "name": "..."}]}`. The platform sometimes emits a
//! single item as a bare object instead of a one-element array, and ids as
//! either numbers or numeric strings; both are accepted here.

use crate::error::{ApiError, ApiResult};
use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            Self::Many(items) => items,
            Self::One(item) => vec![item],
        }
    }
}

/// Decode the items of the collection stored under `key`
///
/// # Errors
/// Returns [`ApiError::Decode`] if the body is not JSON, the key is missing,
/// or an item does not match `T`
pub fn decode_collection<T: DeserializeOwned>(body: &[u8], key: &str) -> ApiResult<Vec<T>> {
    let mut document: Value = serde_json::from_slice(body)?;
    let items = document
        .get_mut(key)
        .map(Value::take)
        .ok_or_else(|| ApiError::Decode(format!("missing `{key}` collection")))?;

    if items.is_null() {
        return Ok(Vec::new());
    }
    let items: OneOrMany<T> = serde_json::from_value(items)
        .map_err(|e| ApiError::Decode(format!("`{key}`: {e}")))?;
    Ok(items.into_vec())
}

/// Accept an identifier encoded as a number or a numeric string
pub fn flexible_id<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Number(i64),
        Text(String),
    }

    match RawId::deserialize(deserializer)? {
        RawId::Number(id) => Ok(id),
        RawId::Text(text) => text
            .trim()
            .parse()
            .map_err(|_| D::Error::custom(format!("invalid id: {text}"))),
    }
}

/// Summary fields shared by every list endpoint
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ObjectSummary {
    #[serde(deserialize_with = "flexible_id")]
    pub id: i64,
    #[serde(default)]
    pub name: String,
    /// Present on group lists only
    #[serde(default)]
    pub is_smart: Option<bool>,
    /// Present on computer extension attribute lists only
    #[serde(default)]
    pub enabled: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_array_collection() {
        let body = br#"{"computer_groups":[
            {"id":1,"name":"All Managed Clients","is_smart":true},
            {"id":2,"name":"Lab","is_smart":false}
        ]}"#;
        let items: Vec<ObjectSummary> = decode_collection(body, "computer_groups").unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].is_smart, Some(true));
        assert_eq!(items[1].name, "Lab");
    }

    #[test]
    fn test_single_item_collapsed_to_object() {
        let body = br#"{"policies":{"id":"7","name":"Install Agent"}}"#;
        let items: Vec<ObjectSummary> = decode_collection(body, "policies").unwrap();
        assert_eq!(
            items,
            vec![ObjectSummary {
                id: 7,
                name: "Install Agent".to_string(),
                is_smart: None,
                enabled: None,
            }]
        );
    }

    #[test]
    fn test_empty_and_null_collections() {
        let items: Vec<ObjectSummary> = decode_collection(br#"{"policies":[]}"#, "policies").unwrap();
        assert!(items.is_empty());
        let items: Vec<ObjectSummary> =
            decode_collection(br#"{"policies":null}"#, "policies").unwrap();
        assert!(items.is_empty());
    }

    #[test]
    fn test_missing_key_and_bad_ids() {
        let missing: ApiResult<Vec<ObjectSummary>> = decode_collection(br#"{"other":[]}"#, "policies");
        assert!(matches!(missing, Err(ApiError::Decode(_))));

        let bad: ApiResult<Vec<ObjectSummary>> =
            decode_collection(br#"{"policies":[{"id":"seven"}]}"#, "policies");
        assert!(matches!(bad, Err(ApiError::Decode(_))));
    }
}
