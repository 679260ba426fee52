//! Log file sink
//!
//! Every formatted event is written straight to the file. If a write fails
//! the sink switches to stderr for the rest of the process.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use tracing_subscriber::fmt::MakeWriter;

use crate::logger::config::FileConfig;
use crate::logger::error::LoggerError;

#[derive(Clone)]
pub struct LogFile {
    sink: Arc<Mutex<Sink>>,
}

enum Sink {
    File(File),
    Stderr,
}

impl LogFile {
    /// Open `config.path`, creating missing parent directories.
    pub fn open(config: &FileConfig) -> Result<Self, LoggerError> {
        if let Some(parent) = config.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .append(config.append)
            .truncate(!config.append)
            .open(&config.path)?;

        Ok(Self {
            sink: Arc::new(Mutex::new(Sink::File(file))),
        })
    }

    #[cfg(test)]
    pub(crate) fn is_redirected_to_stderr(&self) -> bool {
        self.sink
            .lock()
            .map(|sink| matches!(*sink, Sink::Stderr))
            .unwrap_or(true)
    }
}

impl<'a> MakeWriter<'a> for LogFile {
    type Writer = LogFile;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

impl Write for LogFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut sink = self
            .sink
            .lock()
            .map_err(|_| io::Error::other("log file lock poisoned"))?;

        if let Sink::File(file) = &mut *sink {
            match file.write(buf) {
                Ok(written) => return Ok(written),
                Err(e) => {
                    eprintln!("[logger] writing the log file failed, using stderr: {}", e);
                    *sink = Sink::Stderr;
                }
            }
        }

        io::stderr().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut sink = self
            .sink
            .lock()
            .map_err(|_| io::Error::other("log file lock poisoned"))?;

        match &mut *sink {
            Sink::File(file) => file.flush(),
            Sink::Stderr => io::stderr().flush(),
        }
    }
}
