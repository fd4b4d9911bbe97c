//! Configuration loading.

mod loader;
mod types;

pub use loader::{
    load_config, load_config_from_env, load_config_from_str, validate_config, ConfigError,
};
pub use types::{CacheConfig, Config, SourceConfig, StorageConfig};
