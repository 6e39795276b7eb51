//! Typed query model for the origin API.
//!
//! A query is an endpoint plus an ordered list of [`QueryParameter`]s.
//! Parameters render themselves as `key=value` fragments, so a serialized
//! query is always well-formed and two queries built the same way serialize
//! identically.

mod api_query;
mod parameter;

pub use api_query::{ApiQuery, Endpoint};
pub use parameter::{ComicFormat, ComicFormatType, QueryParameter, SortField, SortOrder};
