//! CLI argument parsing with clap
//!
//! This module defines the command-line interface structure using clap,
//! including all commands, arguments, and their documentation.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::config::{BackendKind, Environment};

/// Inspect and maintain the tandem cache
#[derive(Parser, Debug)]
#[command(name = "tandem-cache")]
#[command(about = "Inspect and maintain the tandem cache")]
#[command(long_about = "
tandem-cache reads and writes entries of the configured cache backend
(an embedded redb file or a Redis server), evicts keys in bulk and runs the
scheduled maintenance job.

EXAMPLES:
    # Validate the configuration
    tandem-cache check

    # Store a JSON value for five minutes, then read it back
    tandem-cache set user:42 '{\"name\":\"Ada\"}' --ttl 300
    tandem-cache get user:42

    # Evict every key starting with 'user:' on the Redis backend
    tandem-cache --backend networked flush --prefix user:

    # Purge expired entries and compact the embedded database now
    tandem-cache maintain

    # Run the maintenance scheduler until Ctrl-C
    tandem-cache --env production run
")]
#[command(version = crate::build::CLAP_LONG_VERSION)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path
    ///
    /// Load this single TOML file instead of the layered `config/` directory.
    /// Environment variable overrides still apply.
    #[arg(short, long, global = true, value_name = "FILE", value_parser = super::validation::validate_config_file_path)]
    pub config: Option<PathBuf>,

    /// Override environment detection
    ///
    /// Selects which `{environment}.toml` layer is loaded.
    ///
    /// Available values: development (dev), test, staging (stage), production (prod)
    #[arg(short, long, global = true, value_enum)]
    pub env: Option<Environment>,

    /// Override the configured cache backend
    #[arg(short, long, global = true, value_enum)]
    pub backend: Option<BackendArg>,

    /// Log level override
    ///
    /// Takes precedence over --verbose/--quiet and the configuration file.
    #[arg(long, global = true, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the value stored under KEY as JSON
    Get {
        #[arg(value_parser = super::validation::validate_key)]
        key: String,
    },

    /// Store VALUE under KEY
    ///
    /// VALUE is parsed as JSON; anything that is not valid JSON is stored as
    /// a plain string.
    Set {
        #[arg(value_parser = super::validation::validate_key)]
        key: String,

        value: String,

        /// Seconds until the entry expires (0 or omitted: never)
        #[arg(long, value_name = "SECONDS")]
        ttl: Option<u64>,
    },

    /// Report whether KEY holds a live entry
    Has {
        #[arg(value_parser = super::validation::validate_key)]
        key: String,
    },

    /// Remove KEY
    Forget {
        #[arg(value_parser = super::validation::validate_key)]
        key: String,
    },

    /// Remove every key, or only those starting with --prefix
    Flush {
        #[arg(long, value_name = "PREFIX", value_parser = super::validation::validate_key)]
        prefix: Option<String>,
    },

    /// Purge expired entries and reclaim space once
    Maintain,

    /// Run the maintenance scheduler until interrupted
    Run,

    /// Validate configuration and exit
    ///
    /// Returns exit code 0 if valid, non-zero if invalid.
    Check,
}

/// Cache backend selection
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackendArg {
    Embedded,
    Networked,
}

/// Log level options
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl Cli {
    /// Cross-argument checks clap cannot express
    pub fn validate(&self) -> Result<(), String> {
        if let Commands::Set { ttl: Some(ttl), .. } = &self.command
            && *ttl > i64::MAX as u64 / 1000
        {
            return Err(format!("TTL of {} seconds is out of range", ttl));
        }

        Ok(())
    }

    /// Whether the command needs a live cache connection
    pub fn needs_cache(&self) -> bool {
        !matches!(self.command, Commands::Check)
    }
}

impl From<LogLevel> for String {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => "error".to_string(),
            LogLevel::Warn => "warn".to_string(),
            LogLevel::Info => "info".to_string(),
            LogLevel::Debug => "debug".to_string(),
            LogLevel::Trace => "trace".to_string(),
        }
    }
}

impl From<BackendArg> for BackendKind {
    fn from(backend: BackendArg) -> Self {
        match backend {
            BackendArg::Embedded => BackendKind::Embedded,
            BackendArg::Networked => BackendKind::Networked,
        }
    }
}
