use thiserror::Error;

/// Failure to load or validate [`super::Settings`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// One setting is out of range or malformed; `field` is its dotted path
    #[error("Invalid setting {field}: {message}")]
    ValidationError { field: String, message: String },

    #[error("Invalid environment variable: {0}")]
    EnvVarError(String),

    /// `TANDEM_CONFIG_DIR` and `TANDEM_CONFIG_FILE` were both set
    #[error("Conflicting configuration sources: {0}")]
    MutualExclusivityError(String),

    #[error(transparent)]
    Other(#[from] config::ConfigError),
}

impl ConfigError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        ConfigError::ValidationError {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn file_not_found(path: impl Into<String>) -> Self {
        ConfigError::FileNotFound(path.into())
    }

    pub fn mutual_exclusivity(message: impl Into<String>) -> Self {
        ConfigError::MutualExclusivityError(message.into())
    }

    /// Dotted setting path for validation errors, otherwise the failing stage.
    pub fn key(&self) -> &str {
        match self {
            ConfigError::ValidationError { field, .. } => field,
            ConfigError::FileNotFound(_) => "file",
            ConfigError::EnvVarError(_) | ConfigError::MutualExclusivityError(_) => "environment",
            ConfigError::ParseError(_) | ConfigError::Other(_) => "parse",
        }
    }
}
