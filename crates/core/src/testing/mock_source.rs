//! In-memory catalog source for tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{stream, StreamExt};

use crate::catalog::{Catalog, CatalogItem};
use crate::source::{CatalogSource, ResourceHeaders, SourceError};
use crate::transfer::ContentStream;

/// Scriptable [`CatalogSource`]: items, headers and content are set up
/// front, and every probe and content open is recorded.
pub struct MockCatalogSource {
    source_id: String,
    items: Mutex<Vec<CatalogItem>>,
    headers: Mutex<HashMap<String, ResourceHeaders>>,
    content: Mutex<HashMap<String, Vec<u8>>>,
    failing: Mutex<HashSet<String>>,
    fail_discovery: AtomicBool,
    delay: Mutex<Option<Duration>>,
    probes: Mutex<Vec<String>>,
    opens: Mutex<Vec<String>>,
}

impl MockCatalogSource {
    pub fn new(source_id: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            items: Mutex::new(Vec::new()),
            headers: Mutex::new(HashMap::new()),
            content: Mutex::new(HashMap::new()),
            failing: Mutex::new(HashSet::new()),
            fail_discovery: AtomicBool::new(false),
            delay: Mutex::new(None),
            probes: Mutex::new(Vec::new()),
            opens: Mutex::new(Vec::new()),
        }
    }

    /// Add an item to the published listing, with its header metadata and
    /// content body.
    pub fn publish(&self, item: CatalogItem, last_modified: Option<&str>, content: &[u8]) {
        let id = item.id.clone();
        self.items.lock().unwrap().push(item);
        self.headers.lock().unwrap().insert(
            id.clone(),
            ResourceHeaders {
                last_modified: last_modified.map(str::to_owned),
                content_type: Some("text/csv".to_string()),
            },
        );
        self.content.lock().unwrap().insert(id, content.to_vec());
    }

    /// Remove an item from the published listing (history elsewhere stays).
    pub fn unpublish(&self, id: &str) {
        self.items.lock().unwrap().retain(|i| i.id != id);
    }

    /// Change an item's `Last-Modified` header value.
    pub fn set_last_modified(&self, id: &str, last_modified: Option<&str>) {
        self.headers.lock().unwrap().insert(
            id.to_string(),
            ResourceHeaders {
                last_modified: last_modified.map(str::to_owned),
                content_type: Some("text/csv".to_string()),
            },
        );
    }

    /// Make probes and content opens fail for one item.
    pub fn fail_item(&self, id: &str) {
        self.failing.lock().unwrap().insert(id.to_string());
    }

    pub fn fail_discovery(&self, fail: bool) {
        self.fail_discovery.store(fail, Ordering::SeqCst);
    }

    /// Delay every probe and content open; used to trip deadlines.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn probed_ids(&self) -> Vec<String> {
        self.probes.lock().unwrap().clone()
    }

    pub fn opened_ids(&self) -> Vec<String> {
        self.opens.lock().unwrap().clone()
    }

    async fn maybe_delay(&self) {
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }

    fn check_failing(&self, id: &str) -> Result<(), SourceError> {
        if self.failing.lock().unwrap().contains(id) {
            return Err(SourceError::Status {
                url: format!("mock://{id}"),
                status: 500,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl CatalogSource for MockCatalogSource {
    fn name(&self) -> &str {
        "mock"
    }

    async fn discover(&self) -> Result<Catalog, SourceError> {
        self.maybe_delay().await;
        if self.fail_discovery.load(Ordering::SeqCst) {
            return Err(SourceError::Status {
                url: format!("mock://{}/browse", self.source_id),
                status: 503,
            });
        }

        let mut catalog = Catalog::new(&self.source_id);
        for item in self.items.lock().unwrap().iter() {
            catalog.insert(item.clone());
        }
        Ok(catalog)
    }

    async fn fetch_headers(&self, id: &str) -> Result<ResourceHeaders, SourceError> {
        self.probes.lock().unwrap().push(id.to_string());
        self.maybe_delay().await;
        self.check_failing(id)?;
        Ok(self
            .headers
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .unwrap_or_default())
    }

    async fn open_content(&self, id: &str) -> Result<ContentStream, SourceError> {
        self.opens.lock().unwrap().push(id.to_string());
        self.maybe_delay().await;
        self.check_failing(id)?;

        let body = self
            .content
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .unwrap_or_default();
        // Split into small chunks so consumers see a real stream.
        let chunks: Vec<std::io::Result<Bytes>> = body
            .chunks(16)
            .map(|c| Ok(Bytes::copy_from_slice(c)))
            .collect();
        Ok(stream::iter(chunks).boxed())
    }
}
