//! Trait definitions for the source module.

use async_trait::async_trait;

use crate::catalog::Catalog;
use crate::transfer::ContentStream;

use super::error::SourceError;
use super::types::ResourceHeaders;

/// A remote catalog of datasets that can be listed, probed and streamed.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Returns the name of this source implementation.
    fn name(&self) -> &str;

    /// List every item the source currently publishes.
    async fn discover(&self) -> Result<Catalog, SourceError>;

    /// Probe one resource for its metadata headers without downloading the
    /// content body.
    async fn fetch_headers(&self, id: &str) -> Result<ResourceHeaders, SourceError>;

    /// Open the content of one resource as a lazy byte stream. No bytes are
    /// read until the returned stream is polled.
    async fn open_content(&self, id: &str) -> Result<ContentStream, SourceError>;
}
