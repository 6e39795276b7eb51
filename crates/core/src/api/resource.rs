//! Typed resources decoded from API result objects.

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

use crate::metrics;
use crate::query::Endpoint;

/// A single JSON object from a result list.
pub type JsonObject = Map<String, Value>;

/// Why a result object could not be decoded.
///
/// Decode failures are per record: the record is skipped and the rest of
/// the batch is kept.
#[derive(Debug, Error, PartialEq)]
pub enum DecodeError {
    #[error("missing field: {0}")]
    MissingField(&'static str),

    #[error("invalid field {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },
}

/// A resource type the origin API can return.
pub trait ApiResource: Sized {
    /// Endpoint serving this resource.
    const ENDPOINT: Endpoint;

    /// Decode one result object.
    fn from_json(object: &JsonObject) -> Result<Self, DecodeError>;
}

/// Decode every object, silently dropping the ones that fail.
pub fn decode_all<T: ApiResource>(objects: &[JsonObject]) -> Vec<T> {
    let mut decoded = Vec::with_capacity(objects.len());
    let mut skipped = 0usize;

    for object in objects {
        match T::from_json(object) {
            Ok(resource) => decoded.push(resource),
            Err(e) => {
                skipped += 1;
                debug!("Skipping undecodable {:?} record: {}", T::ENDPOINT, e);
            }
        }
    }

    metrics::RECORDS_DECODED
        .with_label_values(&["decoded"])
        .inc_by(decoded.len() as u64);
    metrics::RECORDS_DECODED
        .with_label_values(&["skipped"])
        .inc_by(skipped as u64);

    decoded
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Named(String);

    impl ApiResource for Named {
        const ENDPOINT: Endpoint = Endpoint::Comics;

        fn from_json(object: &JsonObject) -> Result<Self, DecodeError> {
            object
                .get("name")
                .and_then(Value::as_str)
                .map(|n| Named(n.to_string()))
                .ok_or(DecodeError::MissingField("name"))
        }
    }

    fn object(value: Value) -> JsonObject {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_decode_all_drops_failures() {
        let objects = vec![
            object(json!({"name": "a"})),
            object(json!({"other": 1})),
            object(json!({"name": "b"})),
            object(json!({"name": 3})),
        ];

        let decoded: Vec<Named> = decode_all(&objects);
        let names: Vec<_> = decoded.into_iter().map(|n| n.0).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_decode_all_empty() {
        let decoded: Vec<Named> = decode_all(&[]);
        assert!(decoded.is_empty());
    }
}
