//! Streaming transfer of catalog content into blob storage.

mod error;
mod pipeline;
mod s3;
mod traits;
mod types;

pub use error::TransferError;
pub use pipeline::TransferPipeline;
pub use s3::{AccessPolicy, S3Store, S3StoreOptions};
pub use traits::ObjectStore;
pub use types::{
    ContentStream, TransferOptions, TransferProgress, TransferReceipt, UploadReceipt,
    COMPRESSED_SUFFIX,
};
