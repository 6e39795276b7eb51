//! Paged loading of comic records for a scrolling grid.

mod loader;

pub use loader::{BatchLoader, BatchOutcome, DisplayRefresh};
