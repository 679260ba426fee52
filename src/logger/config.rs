//! Runtime logger configuration
//!
//! Built from [`crate::config::Settings`] and consumed by [`super::init_logger`].
//! Disabled outputs are `None` rather than flagged off.

use std::path::PathBuf;
use std::str::FromStr;

use tracing::Level;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::{Directive, LevelFilter};

use crate::logger::error::LoggerError;

/// Per-target overrides applied on top of the base level unless configured otherwise.
pub const DEFAULT_DIRECTIVES: &[&str] = &["tokio_cron_scheduler=warn"];

#[derive(Debug, Clone, PartialEq)]
pub struct LoggerConfig {
    /// Base level for every target without a directive
    pub level: Level,
    /// `EnvFilter` directives such as `redis=warn` or `tandem_cache::cache=trace`
    pub directives: Vec<String>,
    pub console: Option<ConsoleConfig>,
    pub file: Option<FileConfig>,
}

impl LoggerConfig {
    pub fn new(level: Level, console: Option<ConsoleConfig>, file: Option<FileConfig>) -> Self {
        Self {
            level,
            directives: DEFAULT_DIRECTIVES.iter().map(|d| d.to_string()).collect(),
            console,
            file,
        }
    }

    pub fn with_directives<I, S>(mut self, directives: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.directives = directives.into_iter().map(Into::into).collect();
        self
    }

    pub fn validate(&self) -> Result<(), LoggerError> {
        if self.console.is_none() && self.file.is_none() {
            return Err(LoggerError::config(
                "At least one output (console or file) must be enabled",
            ));
        }

        if let Some(file) = &self.file
            && file.path.as_os_str().is_empty()
        {
            return Err(LoggerError::config("Log file path cannot be empty"));
        }

        self.filter().map(|_| ())
    }

    /// Base level plus every directive, as one filter.
    pub fn filter(&self) -> Result<EnvFilter, LoggerError> {
        self.directives.iter().try_fold(
            EnvFilter::default().add_directive(LevelFilter::from_level(self.level).into()),
            |filter, raw| Ok(filter.add_directive(parse_directive(raw)?)),
        )
    }

    /// The filter rendered as a single directive string.
    pub fn filter_string(&self) -> String {
        std::iter::once(self.level.to_string().to_lowercase())
            .chain(self.directives.iter().cloned())
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self::new(Level::INFO, Some(ConsoleConfig::default()), None)
    }
}

/// Parse a single `target=level` directive.
pub fn parse_directive(raw: &str) -> Result<Directive, LoggerError> {
    raw.trim()
        .parse::<Directive>()
        .map_err(|e| LoggerError::config(format!("Invalid filter directive '{}': {}", raw, e)))
}

/// Console output. Written to stderr so command output on stdout stays clean.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsoleConfig {
    /// Only honored when stderr is a terminal
    pub colored: bool,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self { colored: true }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileConfig {
    pub path: PathBuf,
    pub append: bool,
    pub format: LogFormat,
}

impl FileConfig {
    pub fn new(path: impl Into<PathBuf>, append: bool, format: LogFormat) -> Self {
        Self {
            path: path.into(),
            append,
            format,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Full,
    Compact,
    Json,
}

impl LogFormat {
    pub const ALL: [LogFormat; 3] = [LogFormat::Full, LogFormat::Compact, LogFormat::Json];

    pub fn as_str(&self) -> &'static str {
        match self {
            LogFormat::Full => "full",
            LogFormat::Compact => "compact",
            LogFormat::Json => "json",
        }
    }
}

impl FromStr for LogFormat {
    type Err = LoggerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|format| format.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                LoggerError::config(format!(
                    "Invalid log format '{}'. Valid formats are: full, compact, json",
                    s
                ))
            })
    }
}
