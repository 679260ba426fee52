//! NoOp cache implementation.
//!
//! Used when caching is disabled. Writes are discarded and every read misses.

use async_trait::async_trait;

use crate::cache::{CacheBackend, CacheError};

/// A no-operation cache that doesn't store anything.
///
/// Used when `cache.enabled = false` in configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpStore;

impl NoOpStore {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CacheBackend for NoOpStore {
    fn name(&self) -> &'static str {
        "noop"
    }

    async fn has(&self, _key: &str) -> Result<bool, CacheError> {
        Ok(false)
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, CacheError> {
        Err(CacheError::not_found(key))
    }

    async fn set(
        &self,
        _key: &str,
        _value: Vec<u8>,
        _ttl_seconds: Option<u64>,
    ) -> Result<(), CacheError> {
        Ok(())
    }

    async fn forget(&self, _key: &str) -> Result<(), CacheError> {
        Ok(())
    }

    async fn empty_matching(&self, _prefix: &str) -> Result<(), CacheError> {
        Ok(())
    }
}
