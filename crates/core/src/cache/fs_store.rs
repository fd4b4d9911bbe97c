//! Filesystem-backed catalog store.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::debug;

use crate::catalog::Catalog;

use super::error::CacheError;
use super::traits::CatalogStore;

const CATALOG_FILE: &str = "catalog.json";

/// Keeps the catalog as a JSON file under `base_dir/source_id/catalog.json`.
///
/// Saves write to a sibling temp file and rename into place, so a crash
/// mid-write never leaves a truncated catalog behind.
pub struct FsCatalogStore {
    dir: PathBuf,
    path: PathBuf,
}

impl FsCatalogStore {
    pub fn open(base_dir: impl Into<PathBuf>, source_id: &str) -> Self {
        let dir = base_dir.into().join(source_id);
        let path = dir.join(CATALOG_FILE);
        Self { dir, path }
    }

    /// Location of the catalog file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl CatalogStore for FsCatalogStore {
    fn name(&self) -> &str {
        "fs"
    }

    async fn load(&self) -> Result<Option<Catalog>, CacheError> {
        let raw = match fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let catalog = serde_json::from_slice(&raw)?;
        debug!(path = %self.path.display(), "loaded cached catalog");
        Ok(Some(catalog))
    }

    async fn save(&self, catalog: &Catalog) -> Result<(), CacheError> {
        fs::create_dir_all(&self.dir).await?;
        let tmp = self.path.with_extension("json.tmp");
        let raw = serde_json::to_vec_pretty(catalog)?;
        fs::write(&tmp, raw).await?;
        fs::rename(&tmp, &self.path).await?;
        debug!(path = %self.path.display(), items = catalog.items.len(), "saved catalog");
        Ok(())
    }

    async fn clear(&self) -> Result<(), CacheError> {
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Default cache root: `~/.archivista`.
pub fn default_base_dir() -> PathBuf {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".archivista")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogItem;

    fn sample_catalog() -> Catalog {
        let mut catalog = Catalog::new("data.example.gov");
        catalog.insert(CatalogItem::new("abcd-1234", "Crime Data 2020!!", None));
        catalog
    }

    #[tokio::test]
    async fn test_load_missing_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsCatalogStore::open(dir.path(), "data.example.gov");
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_then_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsCatalogStore::open(dir.path(), "data.example.gov");

        store.save(&sample_catalog()).await.unwrap();
        let loaded = store.load().await.unwrap().unwrap();
        assert_eq!(loaded.source_id, "data.example.gov");
        assert_eq!(loaded.items.len(), 1);
        assert_eq!(loaded.items["abcd-1234"].slug, "crime-data-2020");
    }

    #[tokio::test]
    async fn test_save_creates_source_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsCatalogStore::open(dir.path(), "data.example.gov");
        store.save(&sample_catalog()).await.unwrap();
        assert!(dir.path().join("data.example.gov/catalog.json").exists());
    }

    #[tokio::test]
    async fn test_malformed_cache_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsCatalogStore::open(dir.path(), "data.example.gov");
        std::fs::create_dir_all(dir.path().join("data.example.gov")).unwrap();
        std::fs::write(store.path(), b"{not json").unwrap();

        let err = store.load().await.unwrap_err();
        assert!(matches!(err, CacheError::Malformed(_)));
    }

    #[tokio::test]
    async fn test_clear_removes_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsCatalogStore::open(dir.path(), "data.example.gov");
        store.save(&sample_catalog()).await.unwrap();

        store.clear().await.unwrap();
        assert!(store.load().await.unwrap().is_none());
        // Clearing twice is fine.
        store.clear().await.unwrap();
    }
}
