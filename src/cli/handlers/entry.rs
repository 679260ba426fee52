//! Single-entry commands: get, set, has and forget
//!
//! Values are exchanged as JSON. A `set` value that does not parse as JSON
//! is stored as a JSON string.

use serde_json::Value;

use crate::cache::Cache;
use crate::error::AppResult;

/// Handler for commands that address one key
pub struct EntryCommandHandler {
    cache: Cache,
}

impl EntryCommandHandler {
    pub fn new(cache: Cache) -> Self {
        Self { cache }
    }

    /// Fetch the value stored under `key`.
    ///
    /// # Errors
    /// `AppError::NotFound` if the key is absent or expired
    pub async fn get(&self, key: &str) -> AppResult<Value> {
        Ok(self.cache.get::<Value>(key).await?)
    }

    pub async fn set(&self, key: &str, raw_value: &str, ttl_seconds: Option<u64>) -> AppResult<()> {
        let value = parse_value(raw_value);
        self.cache.set(key, &value, ttl_seconds).await?;

        tracing::debug!(key, ttl_seconds, "Entry stored");
        Ok(())
    }

    pub async fn has(&self, key: &str) -> AppResult<bool> {
        Ok(self.cache.has(key).await?)
    }

    pub async fn forget(&self, key: &str) -> AppResult<()> {
        self.cache.forget(key).await?;
        Ok(())
    }
}

fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}
