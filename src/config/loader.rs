//! Layered configuration loading
//!
//! Sources, lowest priority first:
//! 1. `{dir}/default.toml` (required)
//! 2. `{dir}/{environment}.toml`
//! 3. `{dir}/local.toml`
//! 4. `TANDEM_*` environment variables, `__` separating nested keys
//!
//! A single file (`TANDEM_CONFIG_FILE` or [`ConfigLoader::with_file`]) replaces
//! layers 1-3. Environment variables still apply on top of it.

use std::path::{Path, PathBuf};

use config::{Config, Environment, File, FileFormat};

use crate::config::environment::Environment as AppEnvironment;
use crate::config::error::ConfigError;
use crate::config::settings::Settings;

const CONFIG_DIR_ENV: &str = "TANDEM_CONFIG_DIR";
const CONFIG_FILE_ENV: &str = "TANDEM_CONFIG_FILE";
const DEFAULT_CONFIG_DIR: &str = "config";
const ENV_PREFIX: &str = "TANDEM";
const ENV_SEPARATOR: &str = "__";

/// One TOML file in the stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigSource {
    pub path: PathBuf,
    pub required: bool,
}

impl ConfigSource {
    fn required(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            required: true,
        }
    }

    fn optional(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            required: false,
        }
    }
}

#[derive(Debug)]
pub struct ConfigLoader {
    config_dir: PathBuf,
    config_file: Option<PathBuf>,
    environment: AppEnvironment,
}

impl ConfigLoader {
    /// Read `TANDEM_CONFIG_DIR`, `TANDEM_CONFIG_FILE` and `TANDEM_APP_ENV`.
    ///
    /// # Errors
    ///
    /// `MutualExclusivityError` when both the directory and the file variable are set.
    pub fn new() -> Result<Self, ConfigError> {
        let config_dir = std::env::var_os(CONFIG_DIR_ENV).map(PathBuf::from);
        let config_file = std::env::var_os(CONFIG_FILE_ENV).map(PathBuf::from);

        if config_dir.is_some() && config_file.is_some() {
            return Err(ConfigError::mutual_exclusivity(format!(
                "{} and {} cannot both be set. Use {} for layered configuration or \
                 {} for a single configuration file.",
                CONFIG_DIR_ENV, CONFIG_FILE_ENV, CONFIG_DIR_ENV, CONFIG_FILE_ENV
            )));
        }

        Ok(Self {
            config_dir: config_dir.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_DIR)),
            config_file,
            environment: AppEnvironment::from_env(),
        })
    }

    /// Load a single file instead of the layered directory.
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_file = Some(path.into());
        self
    }

    /// Override the environment read from `TANDEM_APP_ENV`.
    pub fn with_environment(mut self, environment: AppEnvironment) -> Self {
        self.environment = environment;
        self
    }

    pub fn environment(&self) -> AppEnvironment {
        self.environment
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// The files that [`load`](Self::load) reads, lowest priority first.
    pub fn sources(&self) -> Vec<ConfigSource> {
        match &self.config_file {
            Some(file) => vec![ConfigSource::required(file)],
            None => vec![
                ConfigSource::required(self.config_dir.join("default.toml")),
                ConfigSource::optional(
                    self.config_dir
                        .join(format!("{}.toml", self.environment.as_str())),
                ),
                ConfigSource::optional(self.config_dir.join("local.toml")),
            ],
        }
    }

    /// Merge every source, deserialize and validate.
    ///
    /// # Errors
    ///
    /// - `FileNotFound` when a required file is missing
    /// - `ParseError` / `Other` when a source is malformed
    /// - `ValidationError` when a merged value is out of range
    pub fn load(&self) -> Result<Settings, ConfigError> {
        let mut builder = Config::builder();

        for source in self.sources() {
            if source.required && !source.path.is_file() {
                return Err(ConfigError::file_not_found(format!(
                    "Required configuration file not found: {}",
                    source.path.display()
                )));
            }

            builder = builder.add_source(
                File::from(source.path.as_path())
                    .format(FileFormat::Toml)
                    .required(source.required),
            );
        }

        let settings: Settings = builder
            .add_source(env_source())
            .build()?
            .try_deserialize()
            .map_err(|e| ConfigError::ParseError(format!("Failed to deserialize configuration: {}", e)))?;

        settings.validate()?;
        Ok(settings)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new().unwrap_or_else(|_| Self {
            config_dir: PathBuf::from(DEFAULT_CONFIG_DIR),
            config_file: None,
            environment: AppEnvironment::default(),
        })
    }
}

/// Map `TANDEM_*` variables onto configuration keys.
///
/// - `TANDEM_CACHE__BACKEND` -> `cache.backend`
/// - `TANDEM_CACHE__NETWORKED__URL` -> `cache.networked.url`
/// - `TANDEM_LOGGER__DIRECTIVES=redis=warn,bb8=error` -> `logger.directives` (comma separated)
fn env_source() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator(ENV_SEPARATOR)
        .ignore_empty(true)
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("logger.directives")
}
