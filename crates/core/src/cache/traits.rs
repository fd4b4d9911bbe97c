//! Trait definitions for the cache module.

use async_trait::async_trait;

use crate::catalog::Catalog;

use super::error::CacheError;

/// Durable storage for the catalog between runs.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Returns the name of this store implementation.
    fn name(&self) -> &str;

    /// Load the persisted catalog, or `None` when nothing has been saved yet.
    async fn load(&self) -> Result<Option<Catalog>, CacheError>;

    /// Persist the catalog, replacing any previous snapshot.
    async fn save(&self, catalog: &Catalog) -> Result<(), CacheError>;

    /// Drop the persisted catalog. Loading afterwards yields `None`.
    async fn clear(&self) -> Result<(), CacheError>;
}
