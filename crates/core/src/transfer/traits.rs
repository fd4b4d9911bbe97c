//! Trait definitions for the transfer module.

use async_trait::async_trait;

use super::error::TransferError;
use super::types::{ContentStream, UploadReceipt};

/// Durable blob storage the pipeline writes into.
///
/// Implementations must support streaming input; the whole payload is never
/// required to fit in memory.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Returns the name of this store implementation.
    fn name(&self) -> &str;

    /// Make sure the destination bucket exists and is usable.
    async fn ensure_bucket(&self) -> Result<(), TransferError>;

    /// Stream `body` into the object at `key`, splitting large payloads into
    /// chunks uploaded with at most `part_concurrency` in flight.
    async fn put_stream(
        &self,
        key: &str,
        body: ContentStream,
        part_concurrency: usize,
    ) -> Result<UploadReceipt, TransferError>;
}

#[async_trait]
impl<T: ObjectStore + ?Sized> ObjectStore for std::sync::Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn ensure_bucket(&self) -> Result<(), TransferError> {
        (**self).ensure_bucket().await
    }

    async fn put_stream(
        &self,
        key: &str,
        body: ContentStream,
        part_concurrency: usize,
    ) -> Result<UploadReceipt, TransferError> {
        (**self).put_stream(key, body, part_concurrency).await
    }
}
