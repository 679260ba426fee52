use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::cache::Cache;
use crate::jobs::error::{JobError, JobResult};
use crate::jobs::types::{JobContext, JobStatus, JobTask};

/// How long a timed-out task may take to observe its cancellation token.
const CANCEL_GRACE: Duration = Duration::from_secs(1);

/// Tracks which jobs are currently running
#[derive(Clone, Default)]
pub struct ConcurrencyTracker {
    running: Arc<RwLock<HashSet<String>>>,
}

impl ConcurrencyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `job_name` as running; false if it already is.
    pub async fn try_start(&self, job_name: &str) -> bool {
        let mut running = self.running.write().await;
        running.insert(job_name.to_string())
    }

    pub async fn finish(&self, job_name: &str) {
        let mut running = self.running.write().await;
        running.remove(job_name);
    }

    pub async fn is_running(&self, job_name: &str) -> bool {
        self.running.read().await.contains(job_name)
    }
}

/// Executes jobs with a timeout and without overlapping runs
pub struct JobExecutor {
    cache: Cache,
    concurrency: ConcurrencyTracker,
}

impl JobExecutor {
    pub fn new(cache: Cache) -> Self {
        Self {
            cache,
            concurrency: ConcurrencyTracker::new(),
        }
    }

    /// Run `task` once, giving up after `timeout`.
    ///
    /// On timeout the task's cancellation token fires and the task gets
    /// [`CANCEL_GRACE`] to wind down before it is dropped.
    ///
    /// Returns [`JobError::AlreadyRunning`] without running the task when a
    /// previous run of the same job is still active.
    pub async fn execute_job(&self, task: &dyn JobTask, timeout: Duration) -> JobResult<()> {
        let job_name = task.name();

        if !self.concurrency.try_start(job_name).await {
            tracing::warn!(job = job_name, status = %JobStatus::Skipped, "Previous run still active");
            return Err(JobError::AlreadyRunning(job_name.to_string()));
        }

        let result = self.run(task, timeout).await;
        self.concurrency.finish(job_name).await;

        result
    }

    async fn run(&self, task: &dyn JobTask, timeout: Duration) -> JobResult<()> {
        let job_name = task.name();
        let start_time = Instant::now();

        let ctx = JobContext::new(job_name, self.cache.clone());
        let execution_id = ctx.execution_id;
        let cancellation_token = ctx.cancellation_token.clone();

        tracing::info!(job = job_name, %execution_id, status = %JobStatus::Running, "Job started");

        let execution = task.execute(ctx);
        tokio::pin!(execution);

        let finished = tokio::select! {
            result = &mut execution => Some(result),
            _ = tokio::time::sleep(timeout) => None,
        };

        let result = match finished {
            Some(result) => Ok(result),
            None => {
                cancellation_token.cancel();
                if tokio::time::timeout(CANCEL_GRACE, &mut execution).await.is_err() {
                    tracing::warn!(job = job_name, %execution_id, "Job ignored cancellation");
                }
                Err(())
            }
        };
        let duration_ms = start_time.elapsed().as_millis() as u64;

        match result {
            Ok(Ok(())) => {
                tracing::info!(job = job_name, %execution_id, duration_ms, status = %JobStatus::Success, "Job finished");
                Ok(())
            }
            Ok(Err(e)) => {
                tracing::error!(job = job_name, %execution_id, duration_ms, status = %JobStatus::Failed, error = %e, "Job failed");
                Err(e)
            }
            Err(()) => {
                tracing::error!(job = job_name, %execution_id, duration_ms, status = %JobStatus::Timeout, "Job timed out");
                Err(JobError::Timeout(timeout.as_secs()))
            }
        }
    }

    pub fn concurrency(&self) -> &ConcurrencyTracker {
        &self.concurrency
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::NoOpStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn noop_cache() -> Cache {
        Cache::from_backend(Arc::new(NoOpStore::new()))
    }

    #[derive(Debug, Default)]
    struct CountingTask {
        runs: AtomicUsize,
    }

    #[async_trait]
    impl JobTask for CountingTask {
        fn name(&self) -> &'static str {
            "counting"
        }

        async fn execute(&self, _ctx: JobContext) -> JobResult<()> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[derive(Debug)]
    struct SleepyTask {
        sleep: Duration,
    }

    #[async_trait]
    impl JobTask for SleepyTask {
        fn name(&self) -> &'static str {
            "sleepy"
        }

        async fn execute(&self, _ctx: JobContext) -> JobResult<()> {
            tokio::time::sleep(self.sleep).await;
            Ok(())
        }
    }

    #[derive(Debug, Default)]
    struct CooperativeTask {
        saw_cancel: std::sync::atomic::AtomicBool,
    }

    #[async_trait]
    impl JobTask for CooperativeTask {
        fn name(&self) -> &'static str {
            "cooperative"
        }

        async fn execute(&self, ctx: JobContext) -> JobResult<()> {
            ctx.cancellation_token.cancelled().await;
            self.saw_cancel.store(true, Ordering::SeqCst);
            Err(JobError::ExecutionFailed("cancelled".to_string()))
        }
    }

    #[derive(Debug)]
    struct FailingTask;

    #[async_trait]
    impl JobTask for FailingTask {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn execute(&self, _ctx: JobContext) -> JobResult<()> {
            Err(JobError::ExecutionFailed("boom".to_string()))
        }
    }

    #[tokio::test]
    async fn test_successful_run() {
        let executor = JobExecutor::new(noop_cache());
        let task = CountingTask::default();

        executor
            .execute_job(&task, Duration::from_secs(5))
            .await
            .unwrap();
        executor
            .execute_job(&task, Duration::from_secs(5))
            .await
            .unwrap();

        assert_eq!(task.runs.load(Ordering::SeqCst), 2);
        assert!(!executor.concurrency().is_running("counting").await);
    }

    #[tokio::test]
    async fn test_failure_is_returned_and_slot_released() {
        let executor = JobExecutor::new(noop_cache());

        let err = executor
            .execute_job(&FailingTask, Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, JobError::ExecutionFailed(_)));
        assert!(!executor.concurrency().is_running("failing").await);
    }

    #[tokio::test]
    async fn test_timeout() {
        let executor = JobExecutor::new(noop_cache());
        let task = SleepyTask {
            sleep: Duration::from_secs(10),
        };

        let err = executor
            .execute_job(&task, Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(matches!(err, JobError::Timeout(_)));
        assert!(!executor.concurrency().is_running("sleepy").await);
    }

    #[tokio::test]
    async fn test_timeout_cancels_running_task() {
        let executor = JobExecutor::new(noop_cache());
        let task = CooperativeTask::default();

        let err = executor
            .execute_job(&task, Duration::from_millis(50))
            .await
            .unwrap_err();

        assert!(matches!(err, JobError::Timeout(_)));
        assert!(task.saw_cancel.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_overlapping_run_is_skipped() {
        let executor = Arc::new(JobExecutor::new(noop_cache()));
        let task = Arc::new(SleepyTask {
            sleep: Duration::from_millis(300),
        });

        let first = {
            let executor = Arc::clone(&executor);
            let task = Arc::clone(&task);
            tokio::spawn(async move {
                executor
                    .execute_job(task.as_ref(), Duration::from_secs(5))
                    .await
            })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        let second = executor
            .execute_job(task.as_ref(), Duration::from_secs(5))
            .await;

        assert!(matches!(second, Err(JobError::AlreadyRunning(_))));
        assert!(first.await.unwrap().is_ok());
    }
}
