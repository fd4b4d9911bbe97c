//! Catalog persistence between runs.

mod error;
mod fs_store;
mod traits;

pub use error::CacheError;
pub use fs_store::{default_base_dir, FsCatalogStore};
pub use traits::CatalogStore;
