//! Error and report types for the archiver.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::cache::CacheError;
use crate::scanner::{ScanError, ScanOutcome};
use crate::source::SourceError;
use crate::transfer::TransferError;

#[derive(Debug, Error)]
pub enum ArchiverError {
    /// No catalog exists yet; run a catalog update first.
    #[error("No catalog available; run a catalog update first")]
    NoCatalog,

    /// The item id is not present in the catalog.
    #[error("Item not in catalog: {0}")]
    ItemNotFound(String),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Transfer(#[from] TransferError),

    #[error(transparent)]
    Scan(#[from] ScanError),

    /// A per-item operation exceeded its deadline.
    #[error("Operation timed out after {0} ms")]
    Timeout(u64),
}

/// Snapshot of the catalog's sync state.
#[derive(Debug, Clone, Serialize)]
pub struct CatalogStatus {
    pub source_id: String,
    pub modified_at: DateTime<Utc>,
    /// Total tracked items, including ones no longer published remotely.
    pub items: usize,
    /// Items currently flagged for (re-)transfer.
    pub pending_updates: usize,
    /// Items that have never been archived.
    pub never_saved: usize,
}

/// Outcome of a full synchronization run.
#[derive(Debug)]
pub struct RunSummary {
    /// Items known after the catalog update.
    pub discovered: usize,
    /// Per-item results of the metadata scan.
    pub header_scan: ScanOutcome,
    /// Per-item results of the content transfer scan.
    pub data_scan: ScanOutcome,
}
