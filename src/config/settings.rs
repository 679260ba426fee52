//! Configuration settings structures for tandem-cache
//!
//! This module defines all configuration structures that can be loaded from
//! TOML files and environment variables.

use serde::{Deserialize, Serialize};
use tracing::Level;

use crate::config::error::ConfigError;
use crate::logger::{ConsoleConfig, FileConfig, LogFormat, LoggerConfig};

// ============================================================================
// Default value functions
// ============================================================================

fn default_app_name() -> String {
    "tandem-cache".to_string()
}

fn default_app_version() -> String {
    crate::pkg_version().to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_directives() -> Vec<String> {
    crate::logger::DEFAULT_DIRECTIVES
        .iter()
        .map(|d| d.to_string())
        .collect()
}

fn default_true() -> bool {
    true
}

fn default_log_path() -> String {
    "logs/tandem-cache.log".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_cache_directory() -> String {
    "tmp/cache".to_string()
}

fn default_delete_batch_size() -> usize {
    100_000
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

fn default_redis_key_prefix() -> String {
    "tandem".to_string()
}

fn default_max_active() -> u32 {
    10_000
}

fn default_idle_timeout() -> u64 {
    240
}

fn default_redis_connection_timeout() -> u64 {
    5
}

fn default_scan_count() -> usize {
    100
}

fn default_maintenance_schedule() -> String {
    // sec min hour day-of-month month day-of-week: daily at midnight
    "0 0 0 * * *".to_string()
}

fn default_maintenance_timeout() -> u64 {
    3600
}

fn default_session_lifetime() -> u64 {
    1440 // 24 hours
}

fn default_session_key_prefix() -> String {
    "session:".to_string()
}

// ============================================================================
// Application Configuration
// ============================================================================

/// Identity reported in logs and `check` output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationConfig {
    pub name: String,
    pub version: String,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            version: default_app_version(),
        }
    }
}

// ============================================================================
// Logger Settings
// ============================================================================

/// `[logger.console]`: human-readable events on stderr
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleSettings {
    pub enabled: bool,
    /// Ignored when stderr is not a terminal
    pub colored: bool,
}

impl Default for ConsoleSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            colored: true,
        }
    }
}

/// `[logger.file]`: off unless enabled
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileSettings {
    pub enabled: bool,
    pub path: String,
    /// Truncate the file at startup when false
    pub append: bool,
    /// "full", "compact" or "json"
    pub format: String,
}

impl Default for FileSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            path: default_log_path(),
            append: true,
            format: default_log_format(),
        }
    }
}

/// Logger configuration settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggerSettings {
    /// Log level: "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Extra `target=level` filter directives, e.g. `["redis=warn"]`
    #[serde(default = "default_log_directives")]
    pub directives: Vec<String>,

    /// Console output settings
    #[serde(default)]
    pub console: ConsoleSettings,

    /// File output settings
    #[serde(default)]
    pub file: FileSettings,
}

impl Default for LoggerSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            directives: default_log_directives(),
            console: ConsoleSettings::default(),
            file: FileSettings::default(),
        }
    }
}

impl LoggerSettings {
    /// Build the runtime [`LoggerConfig`]; disabled outputs become `None`.
    pub fn into_logger_config(self) -> Result<LoggerConfig, ConfigError> {
        let level = self.level.parse::<Level>().map_err(|_| {
            ConfigError::validation("logger.level", format!("Invalid log level '{}'", self.level))
        })?;

        let console = self.console.enabled.then_some(ConsoleConfig {
            colored: self.console.colored,
        });
        let file = self.file.into_file_config()?;

        let config = LoggerConfig::new(level, console, file).with_directives(self.directives);
        config
            .validate()
            .map_err(|e| ConfigError::validation("logger", e.to_string()))?;

        Ok(config)
    }
}

impl FileSettings {
    /// `None` when file output is disabled
    pub fn into_file_config(self) -> Result<Option<FileConfig>, ConfigError> {
        if !self.enabled {
            return Ok(None);
        }

        let format = self
            .format
            .parse::<LogFormat>()
            .map_err(|e| ConfigError::validation("logger.file.format", e.to_string()))?;

        Ok(Some(FileConfig::new(self.path, self.append, format)))
    }
}

// ============================================================================
// Cache Configuration
// ============================================================================

/// Cache backend type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Local redb database
    #[default]
    Embedded,
    /// Shared Redis server
    Networked,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Embedded => "embedded",
            BackendKind::Networked => "networked",
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Embedded (redb) cache configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddedCacheConfig {
    /// Directory dedicated to the database file
    #[serde(default = "default_cache_directory")]
    pub directory: String,

    /// Keys deleted per write transaction during bulk eviction
    #[serde(default = "default_delete_batch_size")]
    pub delete_batch_size: usize,

    /// Whether every commit is fsynced before returning
    #[serde(default = "default_true")]
    pub sync_writes: bool,
}

impl Default for EmbeddedCacheConfig {
    fn default() -> Self {
        Self {
            directory: default_cache_directory(),
            delete_batch_size: default_delete_batch_size(),
            sync_writes: default_true(),
        }
    }
}

/// Networked (Redis) cache configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkedCacheConfig {
    /// Redis connection URL, credentials included
    #[serde(default = "default_redis_url")]
    pub url: String,

    /// Namespace prepended to every key as `prefix:key`
    #[serde(default = "default_redis_key_prefix")]
    pub key_prefix: String,

    /// Maximum simultaneously open connections
    #[serde(default = "default_max_active")]
    pub max_active: u32,

    /// Idle connections kept open; 0 lets the pool shrink to nothing
    #[serde(default)]
    pub min_idle: u32,

    /// Seconds an idle connection survives before it is closed; 0 keeps idle connections open
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout: u64,

    /// Seconds to wait for a connection before failing
    #[serde(default = "default_redis_connection_timeout")]
    pub connection_timeout: u64,

    /// Whether connections are PINGed before being handed out
    #[serde(default = "default_true")]
    pub test_on_borrow: bool,

    /// COUNT hint for each SCAN page during bulk eviction
    #[serde(default = "default_scan_count")]
    pub scan_count: usize,
}

impl Default for NetworkedCacheConfig {
    fn default() -> Self {
        Self {
            url: default_redis_url(),
            key_prefix: default_redis_key_prefix(),
            max_active: default_max_active(),
            min_idle: 0,
            idle_timeout: default_idle_timeout(),
            connection_timeout: default_redis_connection_timeout(),
            test_on_borrow: default_true(),
            scan_count: default_scan_count(),
        }
    }
}

/// Scheduled housekeeping configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaintenanceConfig {
    /// Whether the maintenance job is scheduled
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Six-field cron expression (with seconds)
    #[serde(default = "default_maintenance_schedule")]
    pub schedule: String,

    /// Maximum duration of one maintenance run in seconds
    #[serde(default = "default_maintenance_timeout")]
    pub timeout_seconds: u64,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            schedule: default_maintenance_schedule(),
            timeout_seconds: default_maintenance_timeout(),
        }
    }
}

/// Cache configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Whether caching is enabled
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Cache backend type
    #[serde(default)]
    pub backend: BackendKind,

    /// Embedded cache settings
    #[serde(default)]
    pub embedded: EmbeddedCacheConfig,

    /// Networked cache settings
    #[serde(default)]
    pub networked: NetworkedCacheConfig,

    /// Maintenance job settings
    #[serde(default)]
    pub maintenance: MaintenanceConfig,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            backend: BackendKind::default(),
            embedded: EmbeddedCacheConfig::default(),
            networked: NetworkedCacheConfig::default(),
            maintenance: MaintenanceConfig::default(),
        }
    }
}

// ============================================================================
// Session Configuration
// ============================================================================

/// Cache-backed session store configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Session lifetime in minutes, used as the entry TTL
    #[serde(default = "default_session_lifetime")]
    pub lifetime_minutes: u64,

    /// Prefix of session keys inside the cache
    #[serde(default = "default_session_key_prefix")]
    pub key_prefix: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            lifetime_minutes: default_session_lifetime(),
            key_prefix: default_session_key_prefix(),
        }
    }
}

// ============================================================================
// Main Settings Structure
// ============================================================================

/// Complete application settings
///
/// This structure represents the entire configuration that can be loaded
/// from TOML files and environment variables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Settings {
    /// Application information
    #[serde(default)]
    pub application: ApplicationConfig,

    /// Logger configuration
    #[serde(default)]
    pub logger: LoggerSettings,

    /// Cache configuration
    #[serde(default)]
    pub cache: CacheConfig,

    /// Session store configuration
    #[serde(default)]
    pub session: SessionConfig,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    // ========================================================================
    // Arbitrary implementations for property-based testing
    // ========================================================================

    fn arb_application_config() -> impl Strategy<Value = ApplicationConfig> {
        (
            "[a-z][a-z0-9-]{0,20}",                 // name: valid app name
            "[0-9]{1,2}\\.[0-9]{1,2}\\.[0-9]{1,2}", // version: semver-like
        )
            .prop_map(|(name, version)| ApplicationConfig { name, version })
    }

    fn arb_logger_settings() -> impl Strategy<Value = LoggerSettings> {
        (
            prop_oneof![
                Just("trace".to_string()),
                Just("debug".to_string()),
                Just("info".to_string()),
                Just("warn".to_string()),
                Just("error".to_string()),
            ],
            any::<bool>(),
            any::<bool>(),
            any::<bool>(),
            prop_oneof![
                Just("json".to_string()),
                Just("full".to_string()),
                Just("compact".to_string()),
            ],
        )
            .prop_map(|(level, colored, file_enabled, append, format)| LoggerSettings {
                level,
                directives: vec!["redis=warn".to_string()],
                console: ConsoleSettings {
                    enabled: true,
                    colored,
                },
                file: FileSettings {
                    enabled: file_enabled,
                    path: "logs/test.log".to_string(),
                    append,
                    format,
                },
            })
    }

    fn arb_cache_config() -> impl Strategy<Value = CacheConfig> {
        (
            any::<bool>(),
            prop_oneof![Just(BackendKind::Embedded), Just(BackendKind::Networked)],
            1usize..=200_000usize, // delete_batch_size
            any::<bool>(),         // sync_writes
            "[a-z]{1,12}",         // key_prefix
            1u32..=10_000u32,      // max_active
            0u32..=50u32,          // min_idle
            1u64..=600u64,         // idle_timeout
        )
            .prop_map(
                |(
                    enabled,
                    backend,
                    delete_batch_size,
                    sync_writes,
                    key_prefix,
                    max_active,
                    min_idle,
                    idle_timeout,
                )| CacheConfig {
                    enabled,
                    backend,
                    embedded: EmbeddedCacheConfig {
                        directory: "tmp/cache".to_string(),
                        delete_batch_size,
                        sync_writes,
                    },
                    networked: NetworkedCacheConfig {
                        key_prefix,
                        max_active,
                        min_idle: min_idle.min(max_active),
                        idle_timeout,
                        ..NetworkedCacheConfig::default()
                    },
                    maintenance: MaintenanceConfig::default(),
                },
            )
    }

    fn arb_settings() -> impl Strategy<Value = Settings> {
        (
            arb_application_config(),
            arb_logger_settings(),
            arb_cache_config(),
            1u64..=10_080u64,
        )
            .prop_map(|(application, logger, cache, lifetime_minutes)| Settings {
                application,
                logger,
                cache,
                session: SessionConfig {
                    lifetime_minutes,
                    ..SessionConfig::default()
                },
            })
    }

    // ========================================================================
    // Property-based tests
    // ========================================================================

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Serializing any valid Settings to TOML and back yields the same value.
        #[test]
        fn prop_settings_round_trip_serialization(settings in arb_settings()) {
            let toml_str = toml::to_string(&settings)
                .expect("Settings should serialize to TOML");

            let deserialized: Settings = toml::from_str(&toml_str)
                .expect("TOML should deserialize back to Settings");

            prop_assert_eq!(settings, deserialized);
        }
    }

    // ========================================================================
    // Unit tests
    // ========================================================================

    #[test]
    fn test_application_config_defaults() {
        let config = ApplicationConfig::default();
        assert_eq!(config.name, "tandem-cache");
        assert_eq!(config.version, crate::pkg_version());
    }

    #[test]
    fn test_cache_config_defaults() {
        let config = CacheConfig::default();
        assert!(config.enabled);
        assert_eq!(config.backend, BackendKind::Embedded);
        assert_eq!(config.embedded.directory, "tmp/cache");
        assert_eq!(config.embedded.delete_batch_size, 100_000);
        assert!(config.embedded.sync_writes);
        assert_eq!(config.networked.url, "redis://127.0.0.1:6379");
        assert_eq!(config.networked.key_prefix, "tandem");
        assert_eq!(config.networked.max_active, 10_000);
        assert_eq!(config.networked.min_idle, 0);
        assert_eq!(config.networked.idle_timeout, 240);
        assert!(config.networked.test_on_borrow);
        assert!(config.maintenance.enabled);
        assert_eq!(config.maintenance.schedule, "0 0 0 * * *");
    }

    #[test]
    fn test_session_config_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.lifetime_minutes, 1440);
        assert_eq!(config.key_prefix, "session:");
    }

    #[test]
    fn test_backend_kind_display() {
        assert_eq!(BackendKind::Embedded.to_string(), "embedded");
        assert_eq!(BackendKind::Networked.to_string(), "networked");
    }

    #[test]
    fn test_file_settings_defaults() {
        let settings = FileSettings::default();
        assert!(!settings.enabled);
        assert_eq!(settings.path, "logs/tandem-cache.log");
        assert!(settings.append);
        assert_eq!(settings.format, "json");
    }

    #[test]
    fn test_settings_serialization_roundtrip() {
        let settings = Settings::default();
        let toml_str = toml::to_string(&settings).expect("Failed to serialize");
        let deserialized: Settings = toml::from_str(&toml_str).expect("Failed to deserialize");
        assert_eq!(settings, deserialized);
    }

    #[test]
    fn test_settings_deserialize_partial() {
        let toml_str = r#"
            [application]
            name = "my-app"

            [cache]
            backend = "networked"

            [cache.networked]
            key_prefix = "myapp"
        "#;

        let settings: Settings = toml::from_str(toml_str).expect("Failed to deserialize");
        assert_eq!(settings.application.name, "my-app");
        assert_eq!(settings.cache.backend, BackendKind::Networked);
        assert_eq!(settings.cache.networked.key_prefix, "myapp");
        assert_eq!(settings.cache.networked.url, "redis://127.0.0.1:6379"); // default
        assert_eq!(settings.cache.embedded.delete_batch_size, 100_000); // default
    }

    #[test]
    fn test_settings_deserialize_full() {
        let toml_str = r#"
            [application]
            name = "test-app"
            version = "1.0.0"

            [logger]
            level = "debug"

            [logger.console]
            enabled = true
            colored = false

            [logger.file]
            enabled = true
            path = "logs/test.log"
            append = false
            format = "compact"

            [cache]
            enabled = true
            backend = "embedded"

            [cache.embedded]
            directory = "/var/cache/app"
            delete_batch_size = 5000
            sync_writes = false

            [cache.networked]
            url = "redis://cache.internal:6380/2"
            key_prefix = "app"
            max_active = 32
            min_idle = 4
            idle_timeout = 60
            connection_timeout = 2
            test_on_borrow = false
            scan_count = 500

            [cache.maintenance]
            enabled = false
            schedule = "0 30 3 * * *"
            timeout_seconds = 120

            [session]
            lifetime_minutes = 60
            key_prefix = "sess:"
        "#;

        let settings: Settings = toml::from_str(toml_str).expect("Failed to deserialize");

        assert_eq!(settings.application.name, "test-app");
        assert_eq!(settings.logger.level, "debug");
        assert!(!settings.logger.console.colored);
        assert_eq!(settings.logger.file.format, "compact");

        assert_eq!(settings.cache.embedded.directory, "/var/cache/app");
        assert_eq!(settings.cache.embedded.delete_batch_size, 5000);
        assert!(!settings.cache.embedded.sync_writes);

        assert_eq!(settings.cache.networked.url, "redis://cache.internal:6380/2");
        assert_eq!(settings.cache.networked.max_active, 32);
        assert_eq!(settings.cache.networked.min_idle, 4);
        assert_eq!(settings.cache.networked.idle_timeout, 60);
        assert_eq!(settings.cache.networked.connection_timeout, 2);
        assert!(!settings.cache.networked.test_on_borrow);
        assert_eq!(settings.cache.networked.scan_count, 500);

        assert!(!settings.cache.maintenance.enabled);
        assert_eq!(settings.cache.maintenance.schedule, "0 30 3 * * *");
        assert_eq!(settings.cache.maintenance.timeout_seconds, 120);

        assert_eq!(settings.session.lifetime_minutes, 60);
        assert_eq!(settings.session.key_prefix, "sess:");
    }

    // ========================================================================
    // LoggerSettings to LoggerConfig conversion tests
    // ========================================================================

    #[test]
    fn test_logger_settings_into_logger_config() {
        let settings = LoggerSettings {
            level: "WARN".to_string(),
            directives: vec!["tandem_cache::cache=debug".to_string()],
            console: ConsoleSettings {
                enabled: true,
                colored: false,
            },
            file: FileSettings::default(),
        };

        let config = settings.into_logger_config().unwrap();
        assert_eq!(config.level, Level::WARN);
        assert_eq!(config.console, Some(ConsoleConfig { colored: false }));
        assert!(config.file.is_none());
        assert_eq!(config.filter_string(), "warn,tandem_cache::cache=debug");
    }

    #[test]
    fn test_file_settings_into_file_config_all_formats() {
        for (format, expected) in [
            ("full", LogFormat::Full),
            ("compact", LogFormat::Compact),
            ("json", LogFormat::Json),
        ] {
            let settings = FileSettings {
                enabled: true,
                format: format.to_string(),
                ..FileSettings::default()
            };
            let config = settings.into_file_config().unwrap().unwrap();
            assert_eq!(config.format, expected);
        }

        assert!(FileSettings::default().into_file_config().unwrap().is_none());
    }

    #[test]
    fn test_file_settings_into_file_config_invalid_format() {
        let settings = FileSettings {
            enabled: true,
            format: "xml".to_string(),
            ..FileSettings::default()
        };
        let result = settings.into_file_config();
        assert!(matches!(
            result,
            Err(ConfigError::ValidationError { ref field, .. }) if field == "logger.file.format"
        ));
    }

    #[test]
    fn test_logger_settings_bad_directive() {
        let settings = LoggerSettings {
            directives: vec!["redis=loudest".to_string()],
            ..LoggerSettings::default()
        };
        assert!(settings.into_logger_config().is_err());
    }

    #[test]
    fn test_logger_settings_into_logger_config_invalid_level() {
        let settings = LoggerSettings {
            level: "loud".to_string(),
            ..LoggerSettings::default()
        };
        assert!(settings.into_logger_config().is_err());
    }

    #[test]
    fn test_logger_settings_into_logger_config_both_disabled() {
        let settings = LoggerSettings {
            console: ConsoleSettings {
                enabled: false,
                colored: false,
            },
            ..LoggerSettings::default()
        };
        assert!(settings.into_logger_config().is_err());
    }
}
