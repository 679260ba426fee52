//! Configuration validation logic
//!
//! This module provides validation methods for all configuration structures
//! to ensure configuration values are within acceptable ranges and formats.

use tracing::Level;

use crate::config::error::ConfigError;
use crate::config::settings::{
    CacheConfig, EmbeddedCacheConfig, FileSettings, LoggerSettings, MaintenanceConfig,
    NetworkedCacheConfig, SessionConfig, Settings,
};
use crate::logger::LogFormat;
use crate::logger::config::parse_directive;

/// URL schemes understood by the redis client
const VALID_REDIS_SCHEMES: &[&str] = &["redis://", "rediss://", "redis+unix://", "unix://"];

impl EmbeddedCacheConfig {
    /// Validate embedded cache configuration
    ///
    /// # Validation Rules
    /// - Directory must not be empty
    /// - Delete batch size must be greater than 0
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.directory.trim().is_empty() {
            return Err(ConfigError::validation(
                "cache.embedded.directory",
                "Cache directory is required when the embedded backend is used.",
            ));
        }

        if self.delete_batch_size == 0 {
            return Err(ConfigError::validation(
                "cache.embedded.delete_batch_size",
                "Delete batch size must be greater than 0.",
            ));
        }

        Ok(())
    }
}

impl NetworkedCacheConfig {
    /// Validate networked cache configuration
    ///
    /// # Validation Rules
    /// - URL must use a redis scheme
    /// - Key prefix must not be empty
    /// - Max active connections must be greater than 0
    /// - Min idle connections must not exceed max active connections
    /// - Connection timeout and scan count must be greater than 0
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !VALID_REDIS_SCHEMES
            .iter()
            .any(|scheme| self.url.starts_with(scheme))
        {
            return Err(ConfigError::ValidationError {
                field: "cache.networked.url".to_string(),
                message: format!(
                    "Invalid Redis URL '{}'. Expected one of: {}",
                    self.url,
                    VALID_REDIS_SCHEMES.join(", ")
                ),
            });
        }

        if self.key_prefix.is_empty() {
            return Err(ConfigError::validation(
                "cache.networked.key_prefix",
                "Key prefix must not be empty; it isolates this application's keys.",
            ));
        }

        if self.max_active == 0 {
            return Err(ConfigError::validation(
                "cache.networked.max_active",
                "Max active connections must be greater than 0.",
            ));
        }

        if self.min_idle > self.max_active {
            return Err(ConfigError::ValidationError {
                field: "cache.networked.min_idle".to_string(),
                message: format!(
                    "Min idle connections ({}) cannot exceed max active connections ({}).",
                    self.min_idle, self.max_active
                ),
            });
        }

        if self.connection_timeout == 0 {
            return Err(ConfigError::validation(
                "cache.networked.connection_timeout",
                "Connection timeout must be greater than 0 seconds.",
            ));
        }

        if self.scan_count == 0 {
            return Err(ConfigError::validation(
                "cache.networked.scan_count",
                "Scan count must be greater than 0.",
            ));
        }

        Ok(())
    }
}

impl MaintenanceConfig {
    /// Validate maintenance configuration
    ///
    /// The cron expression itself is parsed by the scheduler; here we only
    /// check it has the six fields the scheduler expects.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.enabled {
            return Ok(());
        }

        let fields = self.schedule.split_whitespace().count();
        if fields != 6 && fields != 7 {
            return Err(ConfigError::ValidationError {
                field: "cache.maintenance.schedule".to_string(),
                message: format!(
                    "Schedule '{}' must be a cron expression with seconds (6 fields), e.g. \"0 0 0 * * *\".",
                    self.schedule
                ),
            });
        }

        if self.timeout_seconds == 0 {
            return Err(ConfigError::validation(
                "cache.maintenance.timeout_seconds",
                "Maintenance timeout must be greater than 0 seconds.",
            ));
        }

        Ok(())
    }
}

impl CacheConfig {
    /// Validate cache configuration
    ///
    /// Only the section of the selected backend is checked.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.enabled {
            return Ok(());
        }

        match self.backend {
            crate::config::BackendKind::Embedded => self.embedded.validate()?,
            crate::config::BackendKind::Networked => self.networked.validate()?,
        }

        self.maintenance.validate()
    }
}

impl SessionConfig {
    /// Validate session configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.lifetime_minutes == 0 {
            return Err(ConfigError::validation(
                "session.lifetime_minutes",
                "Session lifetime must be greater than 0 minutes.",
            ));
        }

        Ok(())
    }
}

impl FileSettings {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.enabled && self.path.trim().is_empty() {
            return Err(ConfigError::validation(
                "logger.file.path",
                "File path is required when file logging is enabled.",
            ));
        }

        self.format
            .parse::<LogFormat>()
            .map_err(|e| ConfigError::validation("logger.file.format", e.to_string()))?;

        Ok(())
    }
}

impl LoggerSettings {
    /// Validate logger settings
    ///
    /// # Validation Rules
    /// - Log level must be one of: trace, debug, info, warn, error
    /// - Every directive must parse as `target=level`
    /// - If file logging is enabled, path must not be empty
    /// - Log format must be one of: full, compact, json
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.level.parse::<Level>().map_err(|_| {
            ConfigError::validation(
                "logger.level",
                format!(
                    "Invalid log level '{}'. Valid levels are: trace, debug, info, warn, error",
                    self.level
                ),
            )
        })?;

        for directive in &self.directives {
            parse_directive(directive)
                .map_err(|e| ConfigError::validation("logger.directives", e.to_string()))?;
        }

        self.file.validate()
    }
}

impl Settings {
    /// Validate all configuration settings
    ///
    /// This method validates all sub-configurations and returns the first
    /// validation error encountered.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.logger.validate()?;
        self.cache.validate()?;
        self.session.validate()?;
        Ok(())
    }
}
