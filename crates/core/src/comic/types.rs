//! Comic record types and their JSON decoding.

use std::fmt;

use reqwest::Url;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::{ApiResource, DecodeError, JsonObject};
use crate::query::Endpoint;

/// Origin-assigned comic identifier.
///
/// The API may send it as a number or a string; both are kept as the
/// decimal/string form, which also serves as cache key and cloud file stem.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComicId(String);

impl ComicId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ComicId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<u64> for ComicId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl From<&str> for ComicId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Cover image location, as `path` + `.` + `extension`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thumbnail {
    pub path: String,
    pub extension: String,
}

impl Thumbnail {
    pub fn url(&self) -> String {
        format!("{}.{}", self.path, self.extension)
    }
}

/// A comic book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComicRecord {
    pub id: ComicId,
    #[serde(rename = "resourceURI")]
    pub resource_uri: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<Thumbnail>,
}

impl ComicRecord {
    /// Cover image URL, if the comic has a thumbnail.
    pub fn thumbnail_url(&self) -> Option<String> {
        self.thumbnail.as_ref().map(Thumbnail::url)
    }
}

impl ApiResource for ComicRecord {
    const ENDPOINT: Endpoint = Endpoint::Comics;

    fn from_json(object: &JsonObject) -> Result<Self, DecodeError> {
        let id = match object.get("id") {
            Some(Value::Number(n)) => match n.as_u64() {
                Some(n) => ComicId::from(n),
                None => {
                    return Err(DecodeError::InvalidField {
                        field: "id",
                        reason: format!("not a non-negative integer: {}", n),
                    })
                }
            },
            Some(Value::String(s)) if !s.is_empty() => ComicId::new(s.clone()),
            Some(other) => {
                return Err(DecodeError::InvalidField {
                    field: "id",
                    reason: format!("unexpected value: {}", other),
                })
            }
            None => return Err(DecodeError::MissingField("id")),
        };

        let resource_uri = required_str(object, "resourceURI")?;
        Url::parse(resource_uri).map_err(|e| DecodeError::InvalidField {
            field: "resourceURI",
            reason: e.to_string(),
        })?;

        let title = required_str(object, "title")?;

        let thumbnail = match object.get("thumbnail") {
            None | Some(Value::Null) => None,
            Some(value) => Some(
                serde_json::from_value::<Thumbnail>(value.clone()).map_err(|e| {
                    DecodeError::InvalidField {
                        field: "thumbnail",
                        reason: e.to_string(),
                    }
                })?,
            ),
        };

        Ok(Self {
            id,
            resource_uri: resource_uri.to_string(),
            title: title.to_string(),
            thumbnail,
        })
    }
}

fn required_str<'a>(object: &'a JsonObject, field: &'static str) -> Result<&'a str, DecodeError> {
    match object.get(field) {
        Some(Value::String(s)) => Ok(s.as_str()),
        Some(other) => Err(DecodeError::InvalidField {
            field,
            reason: format!("expected a string, got {}", other),
        }),
        None => Err(DecodeError::MissingField(field)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn decode(value: Value) -> Result<ComicRecord, DecodeError> {
        ComicRecord::from_json(value.as_object().unwrap())
    }

    #[test]
    fn test_decode_full_record() {
        let comic = decode(json!({
            "id": 42,
            "resourceURI": "http://origin.test/v1/public/comics/42",
            "title": "Amazing Tales #1",
            "thumbnail": {"path": "http://img.test/covers/42", "extension": "jpg"}
        }))
        .unwrap();

        assert_eq!(comic.id.as_str(), "42");
        assert_eq!(comic.title, "Amazing Tales #1");
        assert_eq!(
            comic.thumbnail_url().as_deref(),
            Some("http://img.test/covers/42.jpg")
        );
    }

    #[test]
    fn test_decode_without_thumbnail() {
        let comic = decode(json!({"id": "1", "resourceURI": "http://x/1", "title": "T"})).unwrap();
        assert_eq!(comic.id, ComicId::from("1"));
        assert!(comic.thumbnail.is_none());
        assert!(comic.thumbnail_url().is_none());
    }

    #[test]
    fn test_null_thumbnail_is_absent() {
        let comic = decode(json!({
            "id": 1, "resourceURI": "http://x/1", "title": "T", "thumbnail": null
        }))
        .unwrap();
        assert!(comic.thumbnail.is_none());
    }

    #[test]
    fn test_missing_fields() {
        assert_eq!(
            decode(json!({"resourceURI": "http://x/1", "title": "T"})).unwrap_err(),
            DecodeError::MissingField("id")
        );
        assert_eq!(
            decode(json!({"id": 1, "title": "T"})).unwrap_err(),
            DecodeError::MissingField("resourceURI")
        );
        assert_eq!(
            decode(json!({"id": 1, "resourceURI": "http://x/1"})).unwrap_err(),
            DecodeError::MissingField("title")
        );
    }

    #[test]
    fn test_serialized_record_decodes_back() {
        let comic = decode(json!({
            "id": 5,
            "resourceURI": "http://origin.test/v1/public/comics/5",
            "title": "Five",
            "thumbnail": {"path": "http://img.test/covers/5", "extension": "jpg"}
        }))
        .unwrap();

        let value = serde_json::to_value(&comic).unwrap();
        assert_eq!(value["resourceURI"], "http://origin.test/v1/public/comics/5");
        assert_eq!(decode(value.clone()).unwrap(), comic);
        assert_eq!(serde_json::from_value::<ComicRecord>(value).unwrap(), comic);
    }

    #[test]
    fn test_invalid_fields() {
        assert!(matches!(
            decode(json!({"id": 1, "resourceURI": "not a uri", "title": "T"})),
            Err(DecodeError::InvalidField { field: "resourceURI", .. })
        ));
        assert!(matches!(
            decode(json!({"id": -3, "resourceURI": "http://x/1", "title": "T"})),
            Err(DecodeError::InvalidField { field: "id", .. })
        ));
        assert!(matches!(
            decode(json!({"id": 1, "resourceURI": "http://x/1", "title": 5})),
            Err(DecodeError::InvalidField { field: "title", .. })
        ));
        assert!(matches!(
            decode(json!({
                "id": 1, "resourceURI": "http://x/1", "title": "T",
                "thumbnail": {"path": "http://img/1"}
            })),
            Err(DecodeError::InvalidField { field: "thumbnail", .. })
        ));
    }
}
