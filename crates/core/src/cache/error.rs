//! Error type for catalog persistence.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cached catalog is malformed: {0}")]
    Malformed(#[from] serde_json::Error),
}
