//! Error type for catalog sources.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    /// No catalog id was configured.
    #[error("No catalog id provided")]
    MissingCatalogId,

    /// The HTTP request itself failed.
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The source answered with a non-success status.
    #[error("Response from {url} was {status}")]
    Status { url: String, status: u16 },

    /// The discovery payload could not be interpreted.
    #[error("Could not parse catalog listing: {0}")]
    Parse(String),

    /// The operation exceeded its deadline.
    #[error("Source operation timed out after {0} ms")]
    Timeout(u64),
}
