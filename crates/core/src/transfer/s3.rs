//! S3-backed object store.
//!
//! Small payloads go up in a single put; anything at or above the multipart
//! threshold is split into parts uploaded through a bounded window. The
//! source stream is read by one task only, so part ordering is derived from
//! read order even when uploads complete out of order.

use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart, ObjectCannedAcl};
use aws_sdk_s3::Client;
use async_trait::async_trait;
use futures::stream::FuturesUnordered;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::error::TransferError;
use super::traits::ObjectStore;
use super::types::{ContentStream, UploadReceipt};

/// Target size of each multipart chunk.
const PART_SIZE: usize = 8 * 1024 * 1024;

/// Payloads smaller than this that fit in the first read go up as a single
/// put; S3 rejects multipart parts under 5 MiB anyway.
const MIN_MULTIPART_BYTES: u64 = 5 * 1024 * 1024;

/// Object visibility applied to everything written by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessPolicy {
    #[default]
    Private,
    PublicRead,
    PublicReadWrite,
    AuthenticatedRead,
}

impl AccessPolicy {
    fn canned_acl(self) -> ObjectCannedAcl {
        match self {
            AccessPolicy::Private => ObjectCannedAcl::Private,
            AccessPolicy::PublicRead => ObjectCannedAcl::PublicRead,
            AccessPolicy::PublicReadWrite => ObjectCannedAcl::PublicReadWrite,
            AccessPolicy::AuthenticatedRead => ObjectCannedAcl::AuthenticatedRead,
        }
    }
}

/// Connection and bucket settings for [`S3Store`].
#[derive(Debug, Clone)]
pub struct S3StoreOptions {
    pub bucket: String,
    pub region: Option<String>,
    pub credential_profile: Option<String>,
    pub access_policy: AccessPolicy,
    pub create_bucket: bool,
}

pub struct S3Store {
    client: Client,
    bucket: String,
    acl: ObjectCannedAcl,
    create_bucket: bool,
}

impl S3Store {
    /// Build a store from ambient AWS configuration, optionally pinned to a
    /// region and a named credential profile.
    pub async fn new(options: S3StoreOptions) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = options.region {
            loader = loader.region(Region::new(region));
        }
        if let Some(profile) = options.credential_profile {
            loader = loader.profile_name(profile);
        }
        let config = loader.load().await;

        Self {
            client: Client::new(&config),
            bucket: options.bucket,
            acl: options.access_policy.canned_acl(),
            create_bucket: options.create_bucket,
        }
    }

    async fn upload_single(&self, key: &str, data: Vec<u8>) -> Result<UploadReceipt, TransferError> {
        let bytes_written = data.len() as u64;
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .acl(self.acl.clone())
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| TransferError::Upload(e.to_string()))?;

        Ok(UploadReceipt {
            key: key.to_string(),
            bytes_written,
            parts: 1,
        })
    }

    async fn upload_one_part(
        &self,
        key: &str,
        upload_id: &str,
        part_number: i32,
        data: Vec<u8>,
    ) -> Result<CompletedPart, TransferError> {
        let output = self
            .client
            .upload_part()
            .bucket(&self.bucket)
            .key(key)
            .upload_id(upload_id)
            .part_number(part_number)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| TransferError::Upload(e.to_string()))?;

        Ok(CompletedPart::builder()
            .set_e_tag(output.e_tag().map(str::to_string))
            .part_number(part_number)
            .build())
    }

    async fn upload_parts(
        &self,
        key: &str,
        upload_id: &str,
        first: Vec<u8>,
        mut finished: bool,
        mut body: ContentStream,
        part_concurrency: usize,
    ) -> Result<UploadReceipt, TransferError> {
        let mut in_flight = FuturesUnordered::new();
        let mut completed: Vec<CompletedPart> = Vec::new();
        let mut bytes_written = first.len() as u64;
        let mut next_number = 1i32;
        let mut pending = Some(first);

        loop {
            while in_flight.len() < part_concurrency {
                let part = match pending.take() {
                    Some(data) => data,
                    None if finished => break,
                    None => {
                        let (data, done) = read_part(&mut body, PART_SIZE).await?;
                        finished = done;
                        if data.is_empty() {
                            break;
                        }
                        bytes_written += data.len() as u64;
                        data
                    }
                };
                let number = next_number;
                next_number += 1;
                in_flight.push(self.upload_one_part(key, upload_id, number, part));
            }

            match in_flight.next().await {
                Some(result) => completed.push(result?),
                None => break,
            }
        }

        completed.sort_by_key(|part| part.part_number());
        let parts = completed.len();
        self.client
            .complete_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .upload_id(upload_id)
            .multipart_upload(
                CompletedMultipartUpload::builder()
                    .set_parts(Some(completed))
                    .build(),
            )
            .send()
            .await
            .map_err(|e| TransferError::Upload(e.to_string()))?;

        Ok(UploadReceipt {
            key: key.to_string(),
            bytes_written,
            parts,
        })
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    fn name(&self) -> &str {
        "s3"
    }

    async fn ensure_bucket(&self) -> Result<(), TransferError> {
        if !self.create_bucket {
            return Ok(());
        }

        match self.client.create_bucket().bucket(&self.bucket).send().await {
            Ok(_) => {
                info!(bucket = %self.bucket, "created bucket");
                Ok(())
            }
            Err(e) => {
                let service_err = e.into_service_error();
                if service_err.is_bucket_already_owned_by_you()
                    || service_err.is_bucket_already_exists()
                {
                    debug!(bucket = %self.bucket, "bucket already present");
                    Ok(())
                } else {
                    Err(TransferError::Bucket(service_err.to_string()))
                }
            }
        }
    }

    async fn put_stream(
        &self,
        key: &str,
        mut body: ContentStream,
        part_concurrency: usize,
    ) -> Result<UploadReceipt, TransferError> {
        let (first, finished) = read_part(&mut body, PART_SIZE).await?;

        if finished && (first.len() as u64) < MIN_MULTIPART_BYTES {
            return self.upload_single(key, first).await;
        }

        let created = self
            .client
            .create_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .acl(self.acl.clone())
            .send()
            .await
            .map_err(|e| TransferError::Upload(e.to_string()))?;
        let upload_id = created
            .upload_id()
            .ok_or_else(|| TransferError::Upload("missing multipart upload id".to_string()))?
            .to_string();

        match self
            .upload_parts(key, &upload_id, first, finished, body, part_concurrency)
            .await
        {
            Ok(receipt) => Ok(receipt),
            Err(e) => {
                warn!(key, error = %e, "aborting multipart upload");
                let _ = self
                    .client
                    .abort_multipart_upload()
                    .bucket(&self.bucket)
                    .key(key)
                    .upload_id(&upload_id)
                    .send()
                    .await;
                Err(e)
            }
        }
    }
}

/// Accumulate stream chunks until at least `target` bytes are buffered or
/// the stream ends. Returns the buffer and whether the stream is exhausted.
async fn read_part(
    body: &mut ContentStream,
    target: usize,
) -> Result<(Vec<u8>, bool), TransferError> {
    let mut buf = Vec::new();
    while buf.len() < target {
        match body.next().await {
            Some(Ok(chunk)) => buf.extend_from_slice(&chunk),
            Some(Err(e)) => return Err(TransferError::SourceRead(e.to_string())),
            None => return Ok((buf, true)),
        }
    }
    Ok((buf, false))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use futures::stream;

    fn chunks(parts: Vec<Vec<u8>>) -> ContentStream {
        stream::iter(parts.into_iter().map(|p| Ok(Bytes::from(p)))).boxed()
    }

    #[tokio::test]
    async fn test_read_part_short_stream_reports_finished() {
        let mut body = chunks(vec![vec![1; 100], vec![2; 50]]);
        let (buf, finished) = read_part(&mut body, 1024).await.unwrap();
        assert_eq!(buf.len(), 150);
        assert!(finished);
    }

    #[tokio::test]
    async fn test_read_part_stops_at_target() {
        let mut body = chunks(vec![vec![1; 100], vec![2; 100], vec![3; 100]]);
        let (buf, finished) = read_part(&mut body, 150).await.unwrap();
        assert_eq!(buf.len(), 200);
        assert!(!finished);

        // The remainder is still readable.
        let (rest, finished) = read_part(&mut body, 1024).await.unwrap();
        assert_eq!(rest.len(), 100);
        assert!(finished);
    }

    #[tokio::test]
    async fn test_read_part_propagates_read_errors() {
        let mut body: ContentStream = stream::iter(vec![
            Ok(Bytes::from_static(b"ok")),
            Err(std::io::Error::other("gone")),
        ])
        .boxed();
        let err = read_part(&mut body, 1024).await.unwrap_err();
        assert!(matches!(err, TransferError::SourceRead(_)));
    }

    #[test]
    fn test_access_policy_maps_to_canned_acl() {
        assert_eq!(AccessPolicy::Private.canned_acl(), ObjectCannedAcl::Private);
        assert_eq!(
            AccessPolicy::PublicRead.canned_acl(),
            ObjectCannedAcl::PublicRead
        );
    }

    #[test]
    fn test_access_policy_snake_case_names() {
        let parsed: AccessPolicy = serde_json::from_str("\"public_read\"").unwrap();
        assert_eq!(parsed, AccessPolicy::PublicRead);
        let parsed: AccessPolicy = serde_json::from_str("\"authenticated_read\"").unwrap();
        assert_eq!(parsed, AccessPolicy::AuthenticatedRead);
        assert_eq!(AccessPolicy::default(), AccessPolicy::Private);
    }
}
