//! In-memory catalog store for tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::cache::{CacheError, CatalogStore};
use crate::catalog::Catalog;

/// Keeps the catalog in memory and counts saves.
pub struct MemoryCatalogStore {
    catalog: Mutex<Option<Catalog>>,
    save_count: AtomicUsize,
    fail_saves: AtomicBool,
}

impl MemoryCatalogStore {
    pub fn new() -> Self {
        Self {
            catalog: Mutex::new(None),
            save_count: AtomicUsize::new(0),
            fail_saves: AtomicBool::new(false),
        }
    }

    /// Start with a catalog already persisted.
    pub fn with_catalog(catalog: Catalog) -> Self {
        let store = Self::new();
        *store.catalog.lock().unwrap() = Some(catalog);
        store
    }

    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    pub fn save_count(&self) -> usize {
        self.save_count.load(Ordering::SeqCst)
    }

    /// Last persisted snapshot, if any.
    pub fn snapshot(&self) -> Option<Catalog> {
        self.catalog.lock().unwrap().clone()
    }
}

impl Default for MemoryCatalogStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CatalogStore for MemoryCatalogStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn load(&self) -> Result<Option<Catalog>, CacheError> {
        Ok(self.catalog.lock().unwrap().clone())
    }

    async fn save(&self, catalog: &Catalog) -> Result<(), CacheError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(CacheError::Io(std::io::Error::other("injected save failure")));
        }
        *self.catalog.lock().unwrap() = Some(catalog.clone());
        self.save_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn clear(&self) -> Result<(), CacheError> {
        *self.catalog.lock().unwrap() = None;
        Ok(())
    }
}
