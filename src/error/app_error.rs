use thiserror::Error;

use crate::cache::CacheError;
use crate::config::ConfigError;
use crate::jobs::JobError;

/// Application-wide error type surfaced by the CLI.
///
/// Each variant wraps the error of one subsystem so callers can tell a
/// misconfiguration apart from an unreachable cache or a failed job.
#[derive(Error, Debug)]
pub enum AppError {
    /// Requested key is absent or expired
    #[error("Key not found: {key}")]
    NotFound { key: String },

    /// Validation error with field-specific details
    #[error("Validation failed for {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("Cache error")]
    Cache {
        #[source]
        source: CacheError,
    },

    /// Configuration error with key information
    #[error("Configuration error: {key}")]
    Configuration {
        key: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Scheduler error")]
    Scheduler {
        #[source]
        source: JobError,
    },

    /// Internal error for unexpected failures
    #[error("Internal error")]
    Internal {
        #[source]
        source: anyhow::Error,
    },
}

impl AppError {
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        AppError::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::NotFound { .. } => 1,
            AppError::Validation { .. } | AppError::Configuration { .. } => 2,
            AppError::Cache { .. } | AppError::Scheduler { .. } | AppError::Internal { .. } => 3,
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        AppError::Internal { source: error }
    }
}

impl From<CacheError> for AppError {
    fn from(error: CacheError) -> Self {
        match error {
            CacheError::NotFound(key) => AppError::NotFound { key },
            other => AppError::Cache { source: other },
        }
    }
}

impl From<ConfigError> for AppError {
    fn from(error: ConfigError) -> Self {
        AppError::Configuration {
            key: error.key().to_string(),
            source: anyhow::Error::from(error),
        }
    }
}

impl From<JobError> for AppError {
    fn from(error: JobError) -> Self {
        AppError::Scheduler { source: error }
    }
}

/// Type alias for Result with AppError to simplify function signatures
pub type AppResult<T> = Result<T, AppError>;
