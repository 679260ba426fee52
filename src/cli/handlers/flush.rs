//! Flush command handler

use crate::cache::Cache;
use crate::error::AppResult;

/// Handler for the flush command
pub struct FlushCommandHandler {
    cache: Cache,
}

impl FlushCommandHandler {
    pub fn new(cache: Cache) -> Self {
        Self { cache }
    }

    /// Remove every key starting with `prefix`, or every key when `None`
    pub async fn execute(&self, prefix: Option<&str>) -> AppResult<()> {
        match prefix {
            Some(prefix) => {
                self.cache.empty_matching(prefix).await?;
                tracing::info!(prefix, backend = self.cache.backend_name(), "Flushed keys by prefix");
                println!("✓ Removed keys starting with '{}'", prefix);
            }
            None => {
                self.cache.empty().await?;
                tracing::info!(backend = self.cache.backend_name(), "Flushed all keys");
                println!("✓ Removed all keys");
            }
        }

        Ok(())
    }
}
