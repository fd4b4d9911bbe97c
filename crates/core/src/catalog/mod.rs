//! Catalog model: tracked items, merge semantics and change detection.

mod detect;
mod merge;
mod types;

pub use detect::{apply_headers, parse_http_date};
pub use merge::merge;
pub use types::{slugify, Catalog, CatalogItem};
