//! Maintain command handler
//!
//! Runs one maintenance pass in the foreground, bounded by the configured
//! job timeout.

use std::time::Duration;

use crate::cache::{Cache, MaintenanceReport};
use crate::config::MaintenanceConfig;
use crate::error::{AppError, AppResult};
use crate::jobs::JobError;

/// Handler for the maintain command
pub struct MaintainCommandHandler {
    cache: Cache,
    timeout: Duration,
}

impl MaintainCommandHandler {
    pub fn new(cache: Cache, config: &MaintenanceConfig) -> Self {
        Self {
            cache,
            timeout: Duration::from_secs(config.timeout_seconds),
        }
    }

    pub async fn execute(&self) -> AppResult<MaintenanceReport> {
        let report = tokio::time::timeout(self.timeout, self.cache.maintain())
            .await
            .map_err(|_| AppError::from(JobError::Timeout(self.timeout.as_secs())))??;

        println!("✓ Purged {} expired entries", report.expired_purged);
        if report.compacted {
            println!("✓ Storage compacted");
        }

        Ok(report)
    }
}
