//! Error type for the transfer pipeline and object stores.

use thiserror::Error;

/// Errors surfaced by transfers.
///
/// Source read errors and destination write errors travel through the same
/// channel; the caller attaches the item id for diagnosis.
#[derive(Debug, Error)]
pub enum TransferError {
    /// Reading from the source byte stream failed.
    #[error("Source read failed: {0}")]
    SourceRead(String),

    /// Writing to the destination failed.
    #[error("Upload failed: {0}")]
    Upload(String),

    /// Bucket provisioning failed.
    #[error("Bucket provisioning failed: {0}")]
    Bucket(String),

    /// The transfer options were invalid.
    #[error("Invalid transfer options: {0}")]
    InvalidOptions(String),
}
