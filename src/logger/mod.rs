//! Process-wide `tracing` subscriber
//!
//! Console output goes to stderr, optional file output uses one of three
//! formats, and the active filter can be swapped at runtime through
//! [`LogLevelHandle`].

pub mod config;
pub mod error;
pub(crate) mod writer;


pub use config::{ConsoleConfig, DEFAULT_DIRECTIVES, FileConfig, LogFormat, LoggerConfig};
pub use error::LoggerError;

use std::io::IsTerminal;
use std::sync::Arc;

use tracing_subscriber::layer::{Layered, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt, reload};

use writer::LogFile;

type FilteredRegistry = Layered<reload::Layer<EnvFilter, Registry>, Registry>;
type BoxedLayer = Box<dyn Layer<FilteredRegistry> + Send + Sync>;

/// Swaps the active filter after [`init_logger`].
#[derive(Clone)]
pub struct LogLevelHandle {
    pub(crate) inner: Arc<reload::Handle<EnvFilter, Registry>>,
}

impl LogLevelHandle {
    /// Accepts a bare level or a full directive list, e.g. `warn,tandem_cache::cache=debug`.
    pub fn set_level(&self, filter: &str) -> Result<(), LoggerError> {
        let filter = EnvFilter::try_new(filter)
            .map_err(|e| LoggerError::config(format!("Invalid filter '{}': {}", filter, e)))?;

        self.inner
            .reload(filter)
            .map_err(|e| LoggerError::reload(e.to_string()))
    }

    pub fn current_level(&self) -> Option<String> {
        self.inner.with_current(|filter| filter.to_string()).ok()
    }
}

/// Install the global subscriber. Fails if one is already installed.
pub fn init_logger(config: LoggerConfig) -> anyhow::Result<LogLevelHandle> {
    config.validate()?;

    let (filter_layer, reload_handle) = reload::Layer::new(config.filter()?);

    // File first: ANSI settings of the console layer must not leak into it
    // (tokio-rs/tracing#1817).
    let mut layers: Vec<BoxedLayer> = Vec::with_capacity(2);
    if let Some(file) = &config.file {
        layers.push(file_layer(file)?);
    }
    if let Some(console) = &config.console {
        layers.push(console_layer(console));
    }

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(layers)
        .try_init()
        .map_err(|e| LoggerError::Install {
            message: e.to_string(),
        })?;

    Ok(LogLevelHandle {
        inner: Arc::new(reload_handle),
    })
}

fn console_layer(config: &ConsoleConfig) -> BoxedLayer {
    fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(config.colored && std::io::stderr().is_terminal())
        .with_target(true)
        .boxed()
}

fn file_layer(config: &FileConfig) -> Result<BoxedLayer, LoggerError> {
    let file = LogFile::open(config)?;
    let layer = fmt::layer().with_ansi(false).with_writer(file);

    Ok(match config.format {
        LogFormat::Full => layer.boxed(),
        LogFormat::Compact => layer.compact().boxed(),
        LogFormat::Json => layer.json().with_current_span(true).boxed(),
    })
}
