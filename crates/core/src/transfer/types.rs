//! Types for the streaming transfer pipeline.

use bytes::Bytes;
use futures::stream::BoxStream;
use serde::Serialize;

/// A pull-based byte stream. Nothing is read from the underlying source
/// until the consumer polls it, which is what lets the pipeline own
/// backpressure end to end.
pub type ContentStream = BoxStream<'static, std::io::Result<Bytes>>;

/// Suffix appended to destination keys when in-flight compression is on.
pub const COMPRESSED_SUFFIX: &str = ".gz";

/// Per-transfer options.
#[derive(Debug, Clone)]
pub struct TransferOptions {
    /// Gzip-encode the byte stream in flight; appends [`COMPRESSED_SUFFIX`]
    /// to the destination key.
    pub compress: bool,
    /// Maximum parallel chunk uploads for a single transfer. Independent of
    /// the scanner's item-level concurrency limit.
    pub part_concurrency: usize,
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self {
            compress: true,
            part_concurrency: 5,
        }
    }
}

/// Result record of a successful transfer.
#[derive(Debug, Clone, Serialize)]
pub struct TransferReceipt {
    /// Destination key the content landed under.
    pub key: String,
    /// Bytes written to the destination (post compression).
    pub bytes_transferred: u64,
}

/// Non-blocking progress signal emitted while a transfer runs.
#[derive(Debug, Clone)]
pub struct TransferProgress {
    /// Destination key being written.
    pub key: String,
    /// Cumulative bytes handed to the destination so far.
    pub bytes_transferred: u64,
}

/// What an object store reports back after writing one object.
#[derive(Debug, Clone)]
pub struct UploadReceipt {
    /// Key the object was stored under.
    pub key: String,
    /// Total bytes written.
    pub bytes_written: u64,
    /// Number of parts the payload was split into (1 for single-shot puts).
    pub parts: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = TransferOptions::default();
        assert!(options.compress);
        assert_eq!(options.part_concurrency, 5);
    }
}
