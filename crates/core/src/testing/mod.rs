//! Test doubles for the seams between modules.

mod memory_cache;
mod mock_object_store;
mod mock_source;

pub use memory_cache::MemoryCatalogStore;
pub use mock_object_store::MockObjectStore;
pub use mock_source::MockCatalogSource;
