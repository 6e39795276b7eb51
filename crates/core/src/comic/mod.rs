//! Comic records returned by the origin API.

mod types;

pub use types::{ComicId, ComicRecord, Thumbnail};
