//! Cache module providing one interface over two storage backends.
//!
//! - Embedded cache (local redb file, single process)
//! - Networked cache (Redis, shared between processes)
//!
//! # Configuration
//!
//! ```toml
//! [cache]
//! enabled = true
//! backend = "embedded"  # or "networked"
//!
//! [cache.embedded]
//! directory = "tmp/cache"
//! delete_batch_size = 100000
//! sync_writes = true
//!
//! [cache.networked]
//! url = "redis://127.0.0.1:6379"
//! key_prefix = "tandem"
//! max_active = 10000
//! idle_timeout = 240
//! ```
//!
//! # Usage
//!
//! ```ignore
//! let cache = Cache::connect(&settings.cache).await?;
//! cache.set("user:42", &profile, Some(300)).await?;
//! let profile: Profile = cache.get("user:42").await?;
//!
//! let rooms = cache
//!     .remember("rooms", Some(60), || async { provider.list_rooms().await })
//!     .await?;
//! ```

mod codec;
mod embedded;
mod error;
mod manager;
mod networked;
mod noop;
mod traits;

pub use codec::EntryCodec;
pub use embedded::EmbeddedStore;
pub use error::CacheError;
pub use manager::Cache;
pub use networked::NetworkedStore;
pub use noop::NoOpStore;
pub use traits::{CacheBackend, MaintenanceReport};

// Re-export config types
pub use crate::config::{BackendKind, CacheConfig, EmbeddedCacheConfig, NetworkedCacheConfig};
