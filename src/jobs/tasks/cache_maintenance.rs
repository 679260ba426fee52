use async_trait::async_trait;

use crate::jobs::error::{JobError, JobResult};
use crate::jobs::types::{JobContext, JobTask};

/// Purges expired entries and reclaims space in the cache backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheMaintenanceTask;

impl CacheMaintenanceTask {
    pub const NAME: &'static str = "cache_maintenance";
}

#[async_trait]
impl JobTask for CacheMaintenanceTask {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn execute(&self, ctx: JobContext) -> JobResult<()> {
        let report = tokio::select! {
            report = ctx.cache.maintain() => report?,
            _ = ctx.cancellation_token.cancelled() => {
                return Err(JobError::ExecutionFailed("maintenance cancelled".to_string()));
            }
        };

        tracing::info!(
            backend = ctx.cache.backend_name(),
            expired_purged = report.expired_purged,
            compacted = report.compacted,
            "Cache maintenance completed"
        );

        Ok(())
    }

    fn description(&self) -> Option<String> {
        Some("Purge expired cache entries and compact storage".to_string())
    }
}
