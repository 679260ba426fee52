use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoggerError {
    #[error("Log file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Logger configuration error: {message}")]
    Config { message: String },

    /// A new filter could not be swapped in
    #[error("Failed to reload log filter: {message}")]
    Reload { message: String },

    /// A global subscriber is already installed
    #[error("Failed to install logger: {message}")]
    Install { message: String },
}

impl LoggerError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn reload(message: impl Into<String>) -> Self {
        Self::Reload {
            message: message.into(),
        }
    }
}
