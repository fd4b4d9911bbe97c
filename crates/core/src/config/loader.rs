//! Configuration loading and validation.
//!
//! Values come from a TOML file merged with `ARCHIVISTA_`-prefixed
//! environment variables; the environment wins. Nested keys use `__` in the
//! environment, e.g. `ARCHIVISTA_STORAGE__BUCKET`.

use std::path::{Path, PathBuf};

use figment::providers::{Env, Format, Toml};
use figment::Figment;
use thiserror::Error;
use tracing::debug;

use super::types::Config;

const ENV_PREFIX: &str = "ARCHIVISTA_";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] figment::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Load configuration from a TOML file, letting the environment override.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.to_path_buf()));
    }
    debug!(path = %path.display(), "loading config file");

    let config = Figment::new()
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
        .extract()?;
    Ok(config)
}

/// Load configuration from the environment alone.
pub fn load_config_from_env() -> Result<Config, ConfigError> {
    let config = Figment::new()
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
        .extract()?;
    Ok(config)
}

/// Parse configuration from a TOML string. Environment does not apply.
pub fn load_config_from_str(raw: &str) -> Result<Config, ConfigError> {
    let config = Figment::new().merge(Toml::string(raw)).extract()?;
    Ok(config)
}

/// Reject configurations that cannot produce a working archiver.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.source.catalog_id.is_empty() {
        return Err(ConfigError::Invalid(
            "source.catalog_id must be set".to_string(),
        ));
    }
    if config.source.format.is_empty() {
        return Err(ConfigError::Invalid(
            "source.format must not be empty".to_string(),
        ));
    }
    if config.source.page_size == 0 {
        return Err(ConfigError::Invalid(
            "source.page_size must be at least 1".to_string(),
        ));
    }
    if config.storage.bucket.is_empty() {
        return Err(ConfigError::Invalid(
            "storage.bucket must be set".to_string(),
        ));
    }
    if config.archiver.concurrency_limit == 0 {
        return Err(ConfigError::Invalid(
            "archiver.concurrency_limit must be at least 1".to_string(),
        ));
    }
    if config.archiver.part_concurrency == 0 {
        return Err(ConfigError::Invalid(
            "archiver.part_concurrency must be at least 1".to_string(),
        ));
    }
    if config.archiver.timeout_ms == 0 {
        return Err(ConfigError::Invalid(
            "archiver.timeout_ms must be at least 1".to_string(),
        ));
    }
    Ok(())
}
