//! The archiver: orchestrates discovery, change detection and transfers.
//!
//! The in-memory catalog is the single source of truth during a run. All
//! mutations happen under one write lock that is held across the mutation
//! and the save that persists it, so the cached snapshot can never run ahead
//! of memory.

use std::future::Future;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info, trace, warn};

use crate::cache::CatalogStore;
use crate::catalog::{apply_headers, merge, Catalog};
use crate::scanner::{scan, ScanOutcome};
use crate::source::CatalogSource;
use crate::transfer::{
    ObjectStore, TransferOptions, TransferPipeline, TransferProgress, TransferReceipt,
};

use super::config::ArchiverConfig;
use super::types::{ArchiverError, CatalogStatus, RunSummary};

pub struct Archiver<S> {
    config: ArchiverConfig,
    format: String,
    source: Arc<dyn CatalogSource>,
    cache: Arc<dyn CatalogStore>,
    pipeline: TransferPipeline<S>,
    catalog: RwLock<Option<Catalog>>,
}

impl<S: ObjectStore> Archiver<S> {
    /// Build an archiver, loading any previously cached catalog.
    pub async fn open(
        config: ArchiverConfig,
        format: impl Into<String>,
        source: Arc<dyn CatalogSource>,
        cache: Arc<dyn CatalogStore>,
        pipeline: TransferPipeline<S>,
    ) -> Result<Self, ArchiverError> {
        let catalog = cache.load().await?;
        if let Some(catalog) = &catalog {
            debug!(
                source_id = %catalog.source_id,
                items = catalog.items.len(),
                "restored catalog from cache"
            );
        }

        Ok(Self {
            config,
            format: format.into(),
            source,
            cache,
            pipeline,
            catalog: RwLock::new(catalog),
        })
    }

    /// Discover the remote catalog and merge it over the known one.
    ///
    /// Known items keep their history and their original name; items gone
    /// from the remote listing are retained. Returns the number of items
    /// known after the merge.
    pub async fn update_catalog(&self) -> Result<usize, ArchiverError> {
        let discovered = self.with_timeout(self.source.discover()).await?;

        let mut guard = self.catalog.write().await;
        let merged = merge(guard.as_ref(), discovered, Utc::now());
        let count = merged.items.len();
        *guard = Some(merged);
        // Memory is updated first; a failed save leaves it authoritative.
        if let Some(catalog) = guard.as_ref() {
            self.cache.save(catalog).await?;
        }

        info!(items = count, "catalog updated");
        Ok(count)
    }

    /// Probe every tracked item's headers and re-evaluate `needs_update`.
    pub async fn scan_headers(&self) -> Result<ScanOutcome, ArchiverError> {
        let ids = {
            let guard = self.catalog.read().await;
            guard.as_ref().ok_or(ArchiverError::NoCatalog)?.item_ids()
        };

        info!(items = ids.len(), "starting header scan");
        let outcome = scan(ids, self.config.concurrency_limit, |id| self.probe_item(id)).await?;
        for failure in &outcome.failures {
            warn!(item = %failure.item_id, error = %failure.error, "header probe failed");
        }
        info!(
            succeeded = outcome.succeeded,
            failed = outcome.failures.len(),
            "header scan finished"
        );
        Ok(outcome)
    }

    /// Transfer content for every item flagged as needing an update.
    pub async fn scan_data(&self) -> Result<ScanOutcome, ArchiverError> {
        let ids = {
            let guard = self.catalog.read().await;
            guard
                .as_ref()
                .ok_or(ArchiverError::NoCatalog)?
                .pending_updates()
        };
        if ids.is_empty() {
            info!("no items need a transfer");
            return Ok(ScanOutcome::default());
        }

        self.pipeline.ensure_bucket().await?;

        info!(items = ids.len(), "starting data scan");
        let outcome = scan(ids, self.config.concurrency_limit, |id| {
            self.archive_item(id)
        })
        .await?;
        for failure in &outcome.failures {
            warn!(item = %failure.item_id, error = %failure.error, "transfer failed");
        }
        info!(
            succeeded = outcome.succeeded,
            failed = outcome.failures.len(),
            "data scan finished"
        );
        Ok(outcome)
    }

    /// Full synchronization: update the catalog, probe headers, transfer
    /// changed content.
    pub async fn run(&self) -> Result<RunSummary, ArchiverError> {
        let discovered = self.update_catalog().await?;
        let header_scan = self.scan_headers().await?;
        let data_scan = self.scan_data().await?;
        Ok(RunSummary {
            discovered,
            header_scan,
            data_scan,
        })
    }

    /// Current sync state of the catalog.
    pub async fn status(&self) -> Result<CatalogStatus, ArchiverError> {
        let guard = self.catalog.read().await;
        let catalog = guard.as_ref().ok_or(ArchiverError::NoCatalog)?;
        Ok(CatalogStatus {
            source_id: catalog.source_id.clone(),
            modified_at: catalog.modified_at,
            items: catalog.items.len(),
            pending_updates: catalog.pending_updates().len(),
            never_saved: catalog
                .items
                .values()
                .filter(|i| i.last_saved.is_none())
                .count(),
        })
    }

    /// Drop the catalog from memory and from the cache.
    pub async fn clear_cache(&self) -> Result<(), ArchiverError> {
        let mut guard = self.catalog.write().await;
        self.cache.clear().await?;
        *guard = None;
        Ok(())
    }

    async fn probe_item(&self, id: String) -> Result<(), ArchiverError> {
        let headers = self.with_timeout(self.source.fetch_headers(&id)).await?;

        let mut guard = self.catalog.write().await;
        let catalog = guard.as_mut().ok_or(ArchiverError::NoCatalog)?;
        let item = catalog
            .items
            .get_mut(&id)
            .ok_or_else(|| ArchiverError::ItemNotFound(id.clone()))?;
        apply_headers(item, &headers, Utc::now());
        self.cache.save(catalog).await?;
        Ok(())
    }

    /// Stream one item's content into storage, then mark it saved.
    ///
    /// Keys embed a fresh timestamp, so a retried item lands under a new key
    /// rather than overwriting a good earlier archive.
    async fn archive_item(&self, id: String) -> Result<TransferReceipt, ArchiverError> {
        let slug = {
            let guard = self.catalog.read().await;
            let catalog = guard.as_ref().ok_or(ArchiverError::NoCatalog)?;
            catalog
                .items
                .get(&id)
                .ok_or_else(|| ArchiverError::ItemNotFound(id.clone()))?
                .slug
                .clone()
        };

        let relative_key = format!(
            "{id}-{slug}/{}__{id}.{}",
            Utc::now().to_rfc3339(),
            self.format
        );
        let body = self.with_timeout(self.source.open_content(&id)).await?;

        let options = TransferOptions {
            compress: self.config.compress,
            part_concurrency: self.config.part_concurrency,
        };
        let (progress_tx, mut progress_rx) = mpsc::channel::<TransferProgress>(16);
        tokio::spawn(async move {
            while let Some(signal) = progress_rx.recv().await {
                trace!(key = %signal.key, bytes = signal.bytes_transferred, "transfer progress");
            }
        });

        let receipt = tokio::time::timeout(
            self.config.timeout(),
            self.pipeline
                .transfer(&relative_key, body, &options, Some(progress_tx)),
        )
        .await
        .map_err(|_| ArchiverError::Timeout(self.config.timeout_ms))??;

        let mut guard = self.catalog.write().await;
        let catalog = guard.as_mut().ok_or(ArchiverError::NoCatalog)?;
        let item = catalog
            .items
            .get_mut(&id)
            .ok_or_else(|| ArchiverError::ItemNotFound(id.clone()))?;
        item.last_saved = Some(Utc::now());
        item.needs_update = false;
        self.cache.save(catalog).await?;

        debug!(item = %id, key = %receipt.key, bytes = receipt.bytes_transferred, "archived");
        Ok(receipt)
    }

    async fn with_timeout<T, E>(
        &self,
        fut: impl Future<Output = Result<T, E>>,
    ) -> Result<T, ArchiverError>
    where
        ArchiverError: From<E>,
    {
        match tokio::time::timeout(self.config.timeout(), fut).await {
            Ok(result) => result.map_err(ArchiverError::from),
            Err(_) => Err(ArchiverError::Timeout(self.config.timeout_ms)),
        }
    }
}
