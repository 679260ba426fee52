use std::fmt;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::cache::Cache;
use crate::jobs::error::JobResult;

/// Everything one run of a task gets to work with.
#[derive(Clone, Debug)]
pub struct JobContext {
    pub execution_id: Uuid,
    pub job_name: &'static str,
    pub cache: Cache,
    /// Cancelled when the run exceeds its timeout
    pub cancellation_token: CancellationToken,
}

impl JobContext {
    /// Context for a fresh run of `job_name` with its own id and token.
    pub fn new(job_name: &'static str, cache: Cache) -> Self {
        Self {
            execution_id: Uuid::new_v4(),
            job_name,
            cache,
            cancellation_token: CancellationToken::new(),
        }
    }
}

/// Outcome attached to job log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Running,
    Success,
    Failed,
    Timeout,
    Skipped,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Running => "running",
            JobStatus::Success => "success",
            JobStatus::Failed => "failed",
            JobStatus::Timeout => "timeout",
            JobStatus::Skipped => "skipped",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unit of scheduled work.
#[async_trait]
pub trait JobTask: Send + Sync + fmt::Debug {
    /// Name used for logging and overlap detection
    fn name(&self) -> &'static str;

    async fn execute(&self, ctx: JobContext) -> JobResult<()>;

    fn description(&self) -> Option<String> {
        None
    }
}
