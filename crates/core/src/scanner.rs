//! Bounded-concurrency batch scanner.
//!
//! Runs one operation per item with a fixed window of in-flight operations.
//! Every outcome is captured individually: a failing item never cancels or
//! blocks its siblings, and the scan returns only after all items have been
//! attempted. Dispatch follows input order while the window has capacity;
//! completion order is unspecified.

use std::fmt::Display;
use std::future::Future;

use futures::{stream, StreamExt};
use thiserror::Error;

/// Errors for scan invocations.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Concurrency limit must be at least 1")]
    InvalidConcurrency,
}

/// A single item's failure, captured as data rather than raised.
#[derive(Debug, Clone)]
pub struct ScanFailure {
    /// Id of the item whose operation failed.
    pub item_id: String,
    /// Error detail for diagnosis.
    pub error: String,
}

/// Aggregate result of a scan over an item set.
#[derive(Debug, Default)]
pub struct ScanOutcome {
    /// Number of operations that completed successfully.
    pub succeeded: usize,
    /// Every failed item with its error detail.
    pub failures: Vec<ScanFailure>,
}

impl ScanOutcome {
    /// Total number of items attempted.
    pub fn attempted(&self) -> usize {
        self.succeeded + self.failures.len()
    }

    /// True when no item failed.
    pub fn all_succeeded(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Apply `op` to every id with at most `concurrency` operations in flight.
///
/// A limit of 1 degenerates to strict sequential processing. There are no
/// retries: each item goes pending, in flight, then succeeded or failed,
/// exactly once per scan.
pub async fn scan<F, Fut, T, E>(
    ids: Vec<String>,
    concurrency: usize,
    op: F,
) -> Result<ScanOutcome, ScanError>
where
    F: Fn(String) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    if concurrency == 0 {
        return Err(ScanError::InvalidConcurrency);
    }

    let op = &op;
    let mut results = stream::iter(ids.into_iter().map(move |id| async move {
        let result = op(id.clone()).await;
        (id, result)
    }))
    .buffer_unordered(concurrency);

    let mut outcome = ScanOutcome::default();
    while let Some((id, result)) = results.next().await {
        match result {
            Ok(_) => outcome.succeeded += 1,
            Err(e) => outcome.failures.push(ScanFailure {
                item_id: id,
                error: e.to_string(),
            }),
        }
    }

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    fn ids(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("item-{i:03}")).collect()
    }

    #[tokio::test]
    async fn test_zero_concurrency_rejected() {
        let result = scan(ids(3), 0, |_id| async { Ok::<(), String>(()) }).await;
        assert!(matches!(result, Err(ScanError::InvalidConcurrency)));
    }

    #[tokio::test]
    async fn test_empty_input() {
        let outcome = scan(vec![], 4, |_id| async { Ok::<(), String>(()) })
            .await
            .unwrap();
        assert_eq!(outcome.attempted(), 0);
        assert!(outcome.all_succeeded());
    }

    #[tokio::test]
    async fn test_failures_are_isolated() {
        // Exactly K failures out of N, regardless of the limit.
        for limit in [1, 3, 16] {
            let outcome = scan(ids(10), limit, |id| async move {
                let n: usize = id[5..].parse().unwrap();
                if n % 3 == 0 {
                    Err(format!("boom {id}"))
                } else {
                    Ok(n)
                }
            })
            .await
            .unwrap();

            assert_eq!(outcome.succeeded, 6, "limit {limit}");
            assert_eq!(outcome.failures.len(), 4, "limit {limit}");
            assert_eq!(outcome.attempted(), 10);
        }
    }

    #[tokio::test]
    async fn test_failure_carries_item_id_and_detail() {
        let outcome = scan(vec!["only-one".to_string()], 2, |_id| async {
            Err::<(), _>("no such resource")
        })
        .await
        .unwrap();

        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].item_id, "only-one");
        assert!(outcome.failures[0].error.contains("no such resource"));
    }

    #[tokio::test]
    async fn test_concurrency_bound_respected() {
        let active = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));
        let limit = 3;

        let outcome = scan(ids(20), limit, |_id| {
            let active = Arc::clone(&active);
            let max_seen = Arc::clone(&max_seen);
            async move {
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                max_seen.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                active.fetch_sub(1, Ordering::SeqCst);
                Ok::<(), String>(())
            }
        })
        .await
        .unwrap();

        assert_eq!(outcome.succeeded, 20);
        assert!(max_seen.load(Ordering::SeqCst) <= limit);
        // With 20 items and 10ms ops the window should actually saturate.
        assert_eq!(max_seen.load(Ordering::SeqCst), limit);
    }

    #[tokio::test]
    async fn test_limit_one_is_sequential_in_input_order() {
        let started: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));

        scan(ids(5), 1, |id| {
            let started = Arc::clone(&started);
            async move {
                started.lock().unwrap().push(id);
                tokio::time::sleep(Duration::from_millis(1)).await;
                Ok::<(), String>(())
            }
        })
        .await
        .unwrap();

        assert_eq!(*started.lock().unwrap(), ids(5));
    }

    #[tokio::test]
    async fn test_dispatch_follows_input_order() {
        let started: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));

        scan(ids(8), 2, |id| {
            let started = Arc::clone(&started);
            async move {
                started.lock().unwrap().push(id);
                tokio::time::sleep(Duration::from_millis(5)).await;
                Ok::<(), String>(())
            }
        })
        .await
        .unwrap();

        assert_eq!(*started.lock().unwrap(), ids(8));
    }
}
