//! Response body parsing.

use serde_json::Value;
use tracing::warn;

use super::resource::JsonObject;
use super::ApiError;

/// Parse a complete response body into its result objects.
///
/// Accepts either a top-level array or an object carrying a `data.results`
/// array. Entries that are not JSON objects are dropped.
pub fn parse_results(body: &[u8]) -> Result<Vec<JsonObject>, ApiError> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| ApiError::InvalidResponseFormat(format!("body is not JSON: {}", e)))?;

    let results = match value {
        Value::Array(items) => items,
        Value::Object(mut root) => match root
            .get_mut("data")
            .and_then(|data| data.get_mut("results"))
            .map(Value::take)
        {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(ApiError::InvalidResponseFormat(
                    "expected an array or an object with data.results".to_string(),
                ))
            }
        },
        _ => {
            return Err(ApiError::InvalidResponseFormat(
                "expected an array or an object with data.results".to_string(),
            ))
        }
    };

    let total = results.len();
    let objects: Vec<JsonObject> = results
        .into_iter()
        .filter_map(|item| match item {
            Value::Object(object) => Some(object),
            _ => None,
        })
        .collect();

    if objects.len() != total {
        warn!(
            "Dropped {} non-object entries from response",
            total - objects.len()
        );
    }

    Ok(objects)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bare_array() {
        let body = br#"[{"id": 1}, {"id": 2}]"#;
        let objects = parse_results(body).unwrap();
        assert_eq!(objects.len(), 2);
        assert_eq!(objects[1]["id"], 2);
    }

    #[test]
    fn test_parse_nested_results() {
        let body = br#"{"code": 200, "data": {"offset": 0, "results": [{"id": 7}]}}"#;
        let objects = parse_results(body).unwrap();
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0]["id"], 7);
    }

    #[test]
    fn test_parse_drops_non_objects() {
        let body = br#"[{"id": 1}, 5, "x", null]"#;
        let objects = parse_results(body).unwrap();
        assert_eq!(objects.len(), 1);
    }

    #[test]
    fn test_parse_rejects_other_shapes() {
        for body in [
            &br#"{"data": {"items": []}}"#[..],
            &br#"{"data": {"results": {}}}"#[..],
            &br#""just a string""#[..],
            &b"not json"[..],
        ] {
            let err = parse_results(body).unwrap_err();
            assert!(matches!(err, ApiError::InvalidResponseFormat(_)));
        }
    }
}
