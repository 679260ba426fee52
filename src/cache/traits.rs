//! CacheBackend trait definition.

use async_trait::async_trait;
use serde::Serialize;

use crate::cache::CacheError;

/// Outcome of one housekeeping pass over a backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MaintenanceReport {
    /// Expired entries physically removed.
    pub expired_purged: u64,
    /// Whether the backend reclaimed storage space.
    pub compacted: bool,
}

/// Trait for cache storage backends.
///
/// Values cross this boundary as opaque, already-encoded bytes; typed access
/// lives on [`crate::cache::Cache`]. Every method is self-contained: no
/// backend holds a transaction or a pooled connection between calls.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Short backend name used in logs.
    fn name(&self) -> &'static str;

    /// Whether a live entry exists for `key`.
    ///
    /// Absent and expired keys yield `Ok(false)`; transport and storage
    /// failures are returned as errors.
    async fn has(&self, key: &str) -> Result<bool, CacheError>;

    /// Fetch the raw bytes stored under `key`.
    ///
    /// Returns [`CacheError::NotFound`] when the key is absent or expired.
    async fn get(&self, key: &str) -> Result<Vec<u8>, CacheError>;

    /// Store `value` under `key`, replacing any previous entry.
    ///
    /// `None` and `Some(0)` store the entry without a deadline.
    async fn set(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl_seconds: Option<u64>,
    ) -> Result<(), CacheError>;

    /// Remove `key`. Removing an absent key succeeds.
    async fn forget(&self, key: &str) -> Result<(), CacheError>;

    /// Remove every key whose name starts with `prefix`.
    ///
    /// Not atomic across the whole prefix: deletion proceeds in independent
    /// batches and a failure leaves earlier batches deleted.
    async fn empty_matching(&self, prefix: &str) -> Result<(), CacheError>;

    /// Remove every key reachable by this backend.
    async fn empty(&self) -> Result<(), CacheError> {
        self.empty_matching("").await
    }

    /// Periodic housekeeping, invoked off the request path.
    async fn maintain(&self) -> Result<MaintenanceReport, CacheError> {
        Ok(MaintenanceReport::default())
    }
}

/// Normalizes a caller supplied TTL: zero means "never expires".
pub(crate) fn effective_ttl(ttl_seconds: Option<u64>) -> Option<u64> {
    ttl_seconds.filter(|ttl| *ttl > 0)
}
