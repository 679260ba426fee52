use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler as TokioCronScheduler};
use uuid::Uuid;

use crate::cache::Cache;
use crate::config::MaintenanceConfig;
use crate::jobs::error::{JobError, JobResult};
use crate::jobs::executor::JobExecutor;
use crate::jobs::tasks::CacheMaintenanceTask;
use crate::jobs::types::JobTask;

/// Wrapper around tokio-cron-scheduler running [`JobTask`]s
pub struct JobScheduler {
    scheduler: Arc<Mutex<TokioCronScheduler>>,
    executor: Arc<JobExecutor>,
}

impl JobScheduler {
    pub async fn new(cache: Cache) -> JobResult<Self> {
        let scheduler = TokioCronScheduler::new().await?;

        Ok(Self {
            scheduler: Arc::new(Mutex::new(scheduler)),
            executor: Arc::new(JobExecutor::new(cache)),
        })
    }

    /// Build a scheduler with the cache maintenance job registered if enabled.
    pub async fn with_maintenance(cache: Cache, config: &MaintenanceConfig) -> JobResult<Self> {
        let scheduler = Self::new(cache).await?;

        if config.enabled {
            scheduler
                .schedule(
                    &config.schedule,
                    Duration::from_secs(config.timeout_seconds),
                    Arc::new(CacheMaintenanceTask),
                )
                .await?;
        } else {
            tracing::info!("Cache maintenance job disabled");
        }

        Ok(scheduler)
    }

    pub async fn start(&self) -> JobResult<()> {
        self.scheduler.lock().await.start().await?;
        Ok(())
    }

    /// Stop the scheduler gracefully
    pub async fn stop(&self) -> JobResult<()> {
        self.scheduler.lock().await.shutdown().await?;
        Ok(())
    }

    /// Register `task` on a six- or seven-field cron expression.
    pub async fn schedule(
        &self,
        cron_expression: &str,
        timeout: Duration,
        task: Arc<dyn JobTask>,
    ) -> JobResult<Uuid> {
        let executor = Arc::clone(&self.executor);
        let job_name = task.name();
        let description = task.description();

        let cron_job = Job::new_async(cron_expression, move |_uuid, _lock| {
            let executor = Arc::clone(&executor);
            let task = Arc::clone(&task);

            Box::pin(async move {
                match executor.execute_job(task.as_ref(), timeout).await {
                    Ok(()) | Err(JobError::AlreadyRunning(_)) => {}
                    Err(e) => tracing::error!(job = task.name(), error = %e, "Job execution failed"),
                }
            })
        })
        .map_err(|e| JobError::InvalidCronExpression(format!("'{}': {}", cron_expression, e)))?;

        let id = self.scheduler.lock().await.add(cron_job).await?;

        tracing::info!(job = job_name, schedule = cron_expression, description = ?description, "Job scheduled");
        Ok(id)
    }

    pub fn executor(&self) -> &Arc<JobExecutor> {
        &self.executor
    }
}
