//! Archiver tuning knobs.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Concurrency and delivery settings for the archiver.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiverConfig {
    /// Maximum items processed in parallel during header and data scans.
    pub concurrency_limit: usize,
    /// Maximum parallel chunk uploads within a single transfer.
    pub part_concurrency: usize,
    /// Per-item deadline in milliseconds, covering one probe or one full
    /// transfer.
    pub timeout_ms: u64,
    /// Gzip content in flight.
    pub compress: bool,
}

impl Default for ArchiverConfig {
    fn default() -> Self {
        Self {
            concurrency_limit: 5,
            part_concurrency: 5,
            timeout_ms: 120_000,
            compress: true,
        }
    }
}

impl ArchiverConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ArchiverConfig::default();
        assert_eq!(config.concurrency_limit, 5);
        assert_eq!(config.timeout_ms, 120_000);
        assert_eq!(config.timeout(), Duration::from_secs(120));
        assert!(config.compress);
    }
}
