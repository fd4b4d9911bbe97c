//! Streaming transfer pipeline.
//!
//! Moves a source byte stream into durable blob storage without buffering
//! the whole payload. Compression happens in flight, chunk by chunk, and
//! progress is reported through a non-blocking channel so a slow observer
//! can never stall the transfer itself.

use std::io::Write;

use bytes::Bytes;
use flate2::write::GzEncoder;
use flate2::Compression;
use futures::{stream, StreamExt};
use tokio::sync::mpsc;
use tracing::debug;

use super::error::TransferError;
use super::traits::ObjectStore;
use super::types::{
    ContentStream, TransferOptions, TransferProgress, TransferReceipt, COMPRESSED_SUFFIX,
};

/// Drives transfers from a content source into an [`ObjectStore`].
///
/// Destination keys are namespaced as `prefix/source_id/relative_key`, so a
/// single bucket can hold archives from several catalogs side by side.
pub struct TransferPipeline<S> {
    store: S,
    source_id: String,
    key_prefix: String,
}

impl<S: ObjectStore> TransferPipeline<S> {
    pub fn new(store: S, source_id: impl Into<String>, key_prefix: impl Into<String>) -> Self {
        Self {
            store,
            source_id: source_id.into(),
            key_prefix: key_prefix.into(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Provision the destination bucket if the store requires it.
    pub async fn ensure_bucket(&self) -> Result<(), TransferError> {
        self.store.ensure_bucket().await
    }

    /// Full destination key for a relative key, including the compression
    /// suffix when compression is on. Empty prefix segments are skipped.
    pub fn destination_key(&self, relative_key: &str, compress: bool) -> String {
        let mut key = [self.key_prefix.as_str(), self.source_id.as_str(), relative_key]
            .iter()
            .filter(|segment| !segment.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join("/");
        if compress {
            key.push_str(COMPRESSED_SUFFIX);
        }
        key
    }

    /// Stream `body` into the store under `relative_key`.
    ///
    /// When `progress` is given, cumulative byte counts (post compression)
    /// are pushed through it as chunks flow; signals are dropped rather than
    /// awaited if the receiver lags.
    pub async fn transfer(
        &self,
        relative_key: &str,
        body: ContentStream,
        options: &TransferOptions,
        progress: Option<mpsc::Sender<TransferProgress>>,
    ) -> Result<TransferReceipt, TransferError> {
        if options.part_concurrency == 0 {
            return Err(TransferError::InvalidOptions(
                "part_concurrency must be at least 1".to_string(),
            ));
        }

        let key = self.destination_key(relative_key, options.compress);
        debug!(key, compress = options.compress, "starting transfer");

        let mut body = if options.compress {
            gzip_stream(body)
        } else {
            body
        };
        if let Some(sender) = progress {
            body = observe_stream(body, key.clone(), sender);
        }

        let receipt = self
            .store
            .put_stream(&key, body, options.part_concurrency)
            .await?;
        debug!(
            key,
            bytes = receipt.bytes_written,
            parts = receipt.parts,
            "transfer complete"
        );

        Ok(TransferReceipt {
            key: receipt.key,
            bytes_transferred: receipt.bytes_written,
        })
    }
}

struct GzipState {
    source: stream::Fuse<ContentStream>,
    encoder: Option<GzEncoder<Vec<u8>>>,
}

/// Gzip-encode a byte stream chunk by chunk.
///
/// Output chunks are emitted as soon as the encoder produces bytes; the
/// trailer is flushed once the source is exhausted. A read error ends the
/// stream after it is forwarded.
fn gzip_stream(source: ContentStream) -> ContentStream {
    let state = GzipState {
        source: source.fuse(),
        encoder: Some(GzEncoder::new(Vec::new(), Compression::default())),
    };

    stream::unfold(state, |mut state| async move {
        let mut encoder = state.encoder.take()?;
        loop {
            match state.source.next().await {
                Some(Ok(chunk)) => {
                    if let Err(e) = encoder.write_all(&chunk) {
                        return Some((Err(e), state));
                    }
                    let ready = std::mem::take(encoder.get_mut());
                    if !ready.is_empty() {
                        state.encoder = Some(encoder);
                        return Some((Ok(Bytes::from(ready)), state));
                    }
                    // Encoder is still buffering; pull more input.
                }
                Some(Err(e)) => return Some((Err(e), state)),
                None => {
                    return match encoder.finish() {
                        Ok(tail) if tail.is_empty() => None,
                        Ok(tail) => Some((Ok(Bytes::from(tail)), state)),
                        Err(e) => Some((Err(e), state)),
                    };
                }
            }
        }
    })
    .boxed()
}

/// Count bytes flowing through a stream and push cumulative totals to
/// `sender` without ever blocking on it.
fn observe_stream(
    body: ContentStream,
    key: String,
    sender: mpsc::Sender<TransferProgress>,
) -> ContentStream {
    let mut total = 0u64;
    body.inspect(move |chunk| {
        if let Ok(bytes) = chunk {
            total += bytes.len() as u64;
            let _ = sender.try_send(TransferProgress {
                key: key.clone(),
                bytes_transferred: total,
            });
        }
    })
    .boxed()
}
