//! Tandem cache
//!
//! One cache interface over two storage backends: an embedded redb file and a
//! pooled Redis server. Entries carry an optional time-to-live; the embedded
//! store is kept small by a scheduled maintenance job.

use shadow_rs::shadow;
shadow!(build);

pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod jobs;
pub mod logger;
pub mod session;

pub use cache::{Cache, CacheBackend, CacheError};
pub use session::{Session, SessionStore};

pub fn pkg_version() -> &'static str {
    build::PKG_VERSION
}

pub fn clap_long_version() -> &'static str {
    build::CLAP_LONG_VERSION
}
