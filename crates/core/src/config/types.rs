//! Configuration model.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::archiver::ArchiverConfig;
use crate::transfer::AccessPolicy;

/// Top-level configuration, assembled from a TOML file and/or
/// `ARCHIVISTA_`-prefixed environment variables.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub source: SourceConfig,
    pub storage: StorageConfig,
    pub cache: CacheConfig,
    pub archiver: ArchiverConfig,
}

/// Which remote catalog to sync and in what content format.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Domain of the catalog, e.g. `data.cityofchicago.org`.
    pub catalog_id: String,
    /// Content format requested for every item (`csv`, `json`, ...).
    pub format: String,
    /// Items requested per discovery page.
    pub page_size: usize,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            catalog_id: String::new(),
            format: "csv".to_string(),
            page_size: 5000,
        }
    }
}

/// Destination bucket settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub bucket: String,
    pub access_policy: AccessPolicy,
    /// Key prefix under which all archives live. May be empty.
    pub key_prefix: String,
    pub region: Option<String>,
    pub credential_profile: Option<String>,
    /// Attempt to create the bucket before the first transfer.
    pub create_bucket_on_start: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            bucket: String::new(),
            access_policy: AccessPolicy::default(),
            key_prefix: String::new(),
            region: None,
            credential_profile: None,
            create_bucket_on_start: true,
        }
    }
}

/// Where the catalog snapshot lives between runs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Base directory for cached catalogs. Defaults to `~/.archivista`.
    pub path: Option<PathBuf>,
}
