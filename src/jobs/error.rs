use thiserror::Error;

use crate::cache::CacheError;

#[derive(Debug, Error)]
pub enum JobError {
    #[error("Job execution failed: {0}")]
    ExecutionFailed(String),

    #[error("Job execution timeout after {0}s")]
    Timeout(u64),

    #[error("Invalid cron expression: {0}")]
    InvalidCronExpression(String),

    /// A previous run of the same job has not finished yet
    #[error("Job already running: {0}")]
    AlreadyRunning(String),

    #[error("Scheduler error: {0}")]
    Scheduler(String),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),
}

impl From<tokio_cron_scheduler::JobSchedulerError> for JobError {
    fn from(error: tokio_cron_scheduler::JobSchedulerError) -> Self {
        JobError::Scheduler(error.to_string())
    }
}

pub type JobResult<T> = Result<T, JobError>;
