//! In-memory object store for tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use futures::StreamExt;

use crate::transfer::{ContentStream, ObjectStore, TransferError, UploadReceipt};

/// Collects uploaded objects in memory, with optional failure injection by
/// key substring.
pub struct MockObjectStore {
    objects: Mutex<HashMap<String, Vec<u8>>>,
    fail_keys_containing: Mutex<Option<String>>,
    ensure_calls: AtomicUsize,
}

impl MockObjectStore {
    pub fn new() -> Self {
        Self {
            objects: Mutex::new(HashMap::new()),
            fail_keys_containing: Mutex::new(None),
            ensure_calls: AtomicUsize::new(0),
        }
    }

    /// Fail any upload whose key contains `fragment`.
    pub fn fail_keys_containing(&self, fragment: &str) {
        *self.fail_keys_containing.lock().unwrap() = Some(fragment.to_string());
    }

    pub fn object(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.lock().unwrap().get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.objects.lock().unwrap().keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn object_count(&self) -> usize {
        self.objects.lock().unwrap().len()
    }

    pub fn ensure_calls(&self) -> usize {
        self.ensure_calls.load(Ordering::SeqCst)
    }
}

impl Default for MockObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ObjectStore for MockObjectStore {
    fn name(&self) -> &str {
        "mock"
    }

    async fn ensure_bucket(&self) -> Result<(), TransferError> {
        self.ensure_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn put_stream(
        &self,
        key: &str,
        mut body: ContentStream,
        _part_concurrency: usize,
    ) -> Result<UploadReceipt, TransferError> {
        let failing = self.fail_keys_containing.lock().unwrap().clone();
        if let Some(fragment) = failing {
            if key.contains(&fragment) {
                return Err(TransferError::Upload(format!("injected failure for {key}")));
            }
        }

        let mut buf = Vec::new();
        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| TransferError::SourceRead(e.to_string()))?;
            buf.extend_from_slice(&chunk);
        }
        let bytes_written = buf.len() as u64;
        self.objects.lock().unwrap().insert(key.to_string(), buf);
        Ok(UploadReceipt {
            key: key.to_string(),
            bytes_written,
            parts: 1,
        })
    }
}
