//! Run command handler
//!
//! Starts the job scheduler and keeps it alive until a shutdown signal.

use std::future::Future;

use crate::cache::Cache;
use crate::config::MaintenanceConfig;
use crate::error::AppResult;
use crate::jobs::JobScheduler;

/// Handler for the run command
pub struct RunCommandHandler {
    cache: Cache,
    maintenance: MaintenanceConfig,
}

impl RunCommandHandler {
    pub fn new(cache: Cache, maintenance: MaintenanceConfig) -> Self {
        Self { cache, maintenance }
    }

    /// Run until Ctrl-C
    pub async fn execute(&self) -> AppResult<()> {
        self.execute_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
            }
        })
        .await
    }

    /// Run until `shutdown` resolves, then stop the scheduler
    pub async fn execute_until<F>(&self, shutdown: F) -> AppResult<()>
    where
        F: Future<Output = ()>,
    {
        let scheduler = JobScheduler::with_maintenance(self.cache.clone(), &self.maintenance).await?;
        scheduler.start().await?;
        tracing::info!(backend = self.cache.backend_name(), "Scheduler started");

        shutdown.await;

        tracing::info!("Shutdown signal received, stopping scheduler");
        scheduler.stop().await?;
        Ok(())
    }
}
