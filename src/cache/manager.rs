//! Typed cache handle that dispatches to the configured backend.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{info, warn};

use crate::cache::embedded::EmbeddedStore;
use crate::cache::networked::NetworkedStore;
use crate::cache::noop::NoOpStore;
use crate::cache::{CacheBackend, CacheError, EntryCodec, MaintenanceReport};
use crate::config::{BackendKind, CacheConfig};

/// Handle to the cache shared by every consumer.
///
/// Cloning is cheap: clones share one backend, and the underlying database
/// handle or connection pool is released when the last clone is dropped.
#[derive(Clone)]
pub struct Cache {
    backend: Arc<dyn CacheBackend>,
    codec: EntryCodec,
}

impl fmt::Debug for Cache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cache")
            .field("backend", &self.backend.name())
            .finish()
    }
}

impl Cache {
    /// Open the backend selected by `config`.
    ///
    /// If caching is disabled, a [`NoOpStore`] is used.
    pub async fn connect(config: &CacheConfig) -> Result<Self, CacheError> {
        let backend: Arc<dyn CacheBackend> = if !config.enabled {
            Arc::new(NoOpStore::new())
        } else {
            match config.backend {
                BackendKind::Embedded => Arc::new(EmbeddedStore::open(&config.embedded).await?),
                BackendKind::Networked => {
                    Arc::new(NetworkedStore::connect(&config.networked).await?)
                }
            }
        };

        info!(backend = backend.name(), "Cache initialized");
        Ok(Self::from_backend(backend))
    }

    /// Wrap an already constructed backend.
    pub fn from_backend(backend: Arc<dyn CacheBackend>) -> Self {
        Self {
            backend,
            codec: EntryCodec::new(),
        }
    }

    pub fn backend(&self) -> &Arc<dyn CacheBackend> {
        &self.backend
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Whether a live entry exists for `key`.
    pub async fn has(&self, key: &str) -> Result<bool, CacheError> {
        self.backend.has(key).await
    }

    /// Fetch and decode the value stored under `key`.
    pub async fn get<T>(&self, key: &str) -> Result<T, CacheError>
    where
        T: DeserializeOwned,
    {
        let bytes = self.backend.get(key).await?;
        self.codec.decode(key, &bytes)
    }

    /// Encode and store `value` under `key`; `None`/`Some(0)` never expires.
    pub async fn set<T>(&self, key: &str, value: &T, ttl_seconds: Option<u64>) -> Result<(), CacheError>
    where
        T: Serialize + ?Sized,
    {
        let bytes = self.codec.encode(key, value)?;
        self.backend.set(key, bytes, ttl_seconds).await
    }

    pub async fn forget(&self, key: &str) -> Result<(), CacheError> {
        self.backend.forget(key).await
    }

    pub async fn empty(&self) -> Result<(), CacheError> {
        self.backend.empty().await
    }

    pub async fn empty_matching(&self, prefix: &str) -> Result<(), CacheError> {
        self.backend.empty_matching(prefix).await
    }

    pub async fn maintain(&self) -> Result<MaintenanceReport, CacheError> {
        self.backend.maintain().await
    }

    /// Return the cached value for `key`, or compute, store and return it.
    ///
    /// Cache failures are logged and never fail the call; only an error from
    /// `compute` is returned.
    pub async fn remember<T, E, F, Fut>(
        &self,
        key: &str,
        ttl_seconds: Option<u64>,
        compute: F,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        match self.get::<T>(key).await {
            Ok(value) => return Ok(value),
            Err(CacheError::NotFound(_)) => {}
            Err(e) => warn!(key, error = %e, "Cache read failed, recomputing"),
        }

        let value = compute().await?;

        if let Err(e) = self.set(key, &value, ttl_seconds).await {
            warn!(key, error = %e, "Failed to store computed value");
        }

        Ok(value)
    }
}
