//! Background jobs scheduled with cron expressions.

pub mod error;
pub mod executor;
pub mod scheduler;
pub mod tasks;
pub mod types;

pub use error::{JobError, JobResult};
pub use executor::{ConcurrencyTracker, JobExecutor};
pub use scheduler::JobScheduler;
pub use tasks::CacheMaintenanceTask;
pub use types::{JobContext, JobStatus, JobTask};
