//! Query construction and serialization.

use super::parameter::{ComicFormat, ComicFormatType, QueryParameter};

/// Resource endpoints served by the origin API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Comics,
}

impl Endpoint {
    /// Path relative to the origin host.
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::Comics => "/v1/public/comics",
        }
    }
}

/// A query against one endpoint.
///
/// Parameters keep the order they were added in. Once handed to the client
/// the query is only borrowed, so it cannot change while a request is running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiQuery {
    endpoint: Endpoint,
    parameters: Vec<QueryParameter>,
}

impl ApiQuery {
    /// Create an empty query for an endpoint.
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            parameters: Vec::new(),
        }
    }

    /// Query for single-issue comic books.
    ///
    /// Starts with `format=comic` and `formatType=comic`.
    pub fn comic_books() -> Self {
        Self::new(Endpoint::Comics)
            .with(QueryParameter::Format(ComicFormat::Comic))
            .with(QueryParameter::FormatType(ComicFormatType::Comic))
    }

    /// Append a parameter.
    pub fn add(&mut self, parameter: QueryParameter) -> &mut Self {
        self.parameters.push(parameter);
        self
    }

    /// Append a parameter, builder style.
    pub fn with(mut self, parameter: QueryParameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn endpoint(&self) -> Endpoint {
        self.endpoint
    }

    pub fn parameters(&self) -> &[QueryParameter] {
        &self.parameters
    }

    /// Rendered `key=value` fragments in insertion order.
    pub fn fragments(&self) -> Vec<String> {
        self.parameters.iter().map(|p| p.to_fragment()).collect()
    }

    /// Serialized parameter component, each fragment prefixed with `&`.
    ///
    /// An empty query serializes to an empty string.
    pub fn to_query_string(&self) -> String {
        self.fragments()
            .iter()
            .fold(String::new(), |acc, fragment| acc + "&" + fragment)
    }
}
