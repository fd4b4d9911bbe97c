//! Orchestration of catalog sync and content archival.

mod config;
mod runner;
mod types;

pub use config::ArchiverConfig;
pub use runner::Archiver;
pub use types::{ArchiverError, CatalogStatus, RunSummary};
