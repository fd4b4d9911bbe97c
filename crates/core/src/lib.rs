//! Catalog synchronization and blob archival.
//!
//! Discovers datasets published by a remote catalog, tracks their sync state
//! across runs, detects changes from resource metadata, and streams changed
//! content into durable blob storage.

pub mod archiver;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod scanner;
pub mod source;
pub mod testing;
pub mod transfer;

pub use archiver::{Archiver, ArchiverConfig, ArchiverError, CatalogStatus, RunSummary};
pub use cache::{CatalogStore, FsCatalogStore};
pub use catalog::{Catalog, CatalogItem};
pub use config::{Config, ConfigError};
pub use scanner::{scan, ScanOutcome};
pub use source::{CatalogSource, SocrataSource};
pub use transfer::{ObjectStore, S3Store, TransferPipeline};
