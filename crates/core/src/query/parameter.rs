//! Query parameters accepted by the origin API.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Date format expected by the `dateRange` parameter.
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Publication format of a comic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComicFormat {
    Comic,
    Magazine,
    TradePaperback,
    Hardcover,
    Digest,
    GraphicNovel,
    DigitalComic,
    InfiniteComic,
}

impl ComicFormat {
    /// Value as understood by the API.
    pub fn as_str(&self) -> &'static str {
        match self {
            ComicFormat::Comic => "comic",
            ComicFormat::Magazine => "magazine",
            ComicFormat::TradePaperback => "trade paperback",
            ComicFormat::Hardcover => "hard cover",
            ComicFormat::Digest => "digest",
            ComicFormat::GraphicNovel => "graphic novel",
            ComicFormat::DigitalComic => "digital comic",
            ComicFormat::InfiniteComic => "infinite comic",
        }
    }
}

/// Whether to fetch single issues or collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComicFormatType {
    Comic,
    Collection,
}

impl ComicFormatType {
    /// Value as understood by the API.
    pub fn as_str(&self) -> &'static str {
        match self {
            ComicFormatType::Comic => "comic",
            ComicFormatType::Collection => "collection",
        }
    }
}

/// Fields the comics endpoint can be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortField {
    FocDate,
    OnsaleDate,
    Title,
    IssueNumber,
    Modified,
}

impl SortField {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortField::FocDate => "focDate",
            SortField::OnsaleDate => "onsaleDate",
            SortField::Title => "title",
            SortField::IssueNumber => "issueNumber",
            SortField::Modified => "modified",
        }
    }
}

/// A sort field plus direction, rendered as `field` or `-field`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SortOrder {
    pub field: SortField,
    pub descending: bool,
}

impl SortOrder {
    pub fn ascending(field: SortField) -> Self {
        Self {
            field,
            descending: false,
        }
    }

    pub fn descending(field: SortField) -> Self {
        Self {
            field,
            descending: true,
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.descending {
            write!(f, "-{}", self.field.as_str())
        } else {
            f.write_str(self.field.as_str())
        }
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (descending, name) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };

        let field = match name {
            "focDate" => SortField::FocDate,
            "onsaleDate" => SortField::OnsaleDate,
            "title" => SortField::Title,
            "issueNumber" => SortField::IssueNumber,
            "modified" => SortField::Modified,
            other => return Err(format!("unknown sort field: {}", other)),
        };

        Ok(Self { field, descending })
    }
}

impl Serialize for SortOrder {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SortOrder {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// A single typed query parameter.
///
/// The variant set is closed, so a query can only ever contain parameters
/// the API understands.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryParameter {
    Limit(u32),
    Offset(u32),
    OrderBy(SortOrder),
    DateRange(NaiveDate, NaiveDate),
    ExcludeVariants(bool),
    Format(ComicFormat),
    FormatType(ComicFormatType),
}

impl QueryParameter {
    /// Parameter name on the wire.
    pub fn key(&self) -> &'static str {
        match self {
            QueryParameter::Limit(_) => "limit",
            QueryParameter::Offset(_) => "offset",
            QueryParameter::OrderBy(_) => "orderBy",
            QueryParameter::DateRange(_, _) => "dateRange",
            QueryParameter::ExcludeVariants(_) => "noVariants",
            QueryParameter::Format(_) => "format",
            QueryParameter::FormatType(_) => "formatType",
        }
    }

    /// Unencoded parameter value.
    pub fn value(&self) -> String {
        match self {
            QueryParameter::Limit(limit) => limit.to_string(),
            QueryParameter::Offset(offset) => offset.to_string(),
            QueryParameter::OrderBy(order) => order.to_string(),
            QueryParameter::DateRange(start, end) => format!(
                "{},{}",
                start.format(DATE_FORMAT),
                end.format(DATE_FORMAT)
            ),
            QueryParameter::ExcludeVariants(exclude) => exclude.to_string(),
            QueryParameter::Format(format) => format.as_str().to_string(),
            QueryParameter::FormatType(format_type) => format_type.as_str().to_string(),
        }
    }

    /// Renders the parameter as one `key=value` fragment.
    ///
    /// Free-text values are percent-encoded. The date range keeps its
    /// separating comma since both dates are plain `YYYY-MM-DD`.
    pub fn to_fragment(&self) -> String {
        match self {
            QueryParameter::DateRange(_, _) => format!("{}={}", self.key(), self.value()),
            _ => format!("{}={}", self.key(), urlencoding::encode(&self.value())),
        }
    }
}
