//! Networked cache on a shared Redis server, reached through a bb8 pool.

use std::collections::BTreeSet;
use std::time::Duration;

use async_trait::async_trait;
use bb8::{Builder, Pool, PooledConnection};
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client};
use tracing::{debug, info};

use crate::cache::traits::effective_ttl;
use crate::cache::{CacheBackend, CacheError};
use crate::config::NetworkedCacheConfig;

type RedisPool = Pool<Client>;

/// Upper bound on keys passed to a single DEL.
const DELETE_CHUNK: usize = 1_000;

/// `namespace:key`, the form every key takes on the server.
fn namespaced(namespace: &str, key: &str) -> String {
    format!("{}:{}", namespace, key)
}

/// Escape Redis glob metacharacters so `input` matches literally.
fn escape_glob(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\' | '^' | '-') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// SCAN MATCH pattern selecting every key of `namespace` starting with `prefix`.
fn scan_pattern(namespace: &str, prefix: &str) -> String {
    format!("{}*", escape_glob(&namespaced(namespace, prefix)))
}

/// Pool settings from `config`.
///
/// bb8 asserts on zero sizes and durations, so those are refused here or
/// mapped to "unbounded": `min_idle = 0` keeps no floor and
/// `idle_timeout = 0` never reaps idle connections.
fn pool_builder(config: &NetworkedCacheConfig) -> Result<Builder<Client>, CacheError> {
    if config.max_active == 0 {
        return Err(CacheError::Connection(
            "max_active must be greater than 0".to_string(),
        ));
    }
    if config.connection_timeout == 0 {
        return Err(CacheError::Connection(
            "connection_timeout must be greater than 0".to_string(),
        ));
    }

    let min_idle = (config.min_idle > 0).then(|| config.min_idle.min(config.max_active));
    let idle_timeout = (config.idle_timeout > 0).then(|| Duration::from_secs(config.idle_timeout));

    Ok(Pool::builder()
        .max_size(config.max_active)
        .min_idle(min_idle)
        .idle_timeout(idle_timeout)
        .connection_timeout(Duration::from_secs(config.connection_timeout))
        .test_on_check_out(config.test_on_borrow))
}

/// Redis-based cache with a bb8 connection pool.
///
/// Each command checks a connection out of the pool and returns it as soon as
/// the reply arrives.
pub struct NetworkedStore {
    pool: RedisPool,
    namespace: String,
    scan_count: usize,
}

impl NetworkedStore {
    /// Build the pool and verify the server answers.
    ///
    /// Fails with [`CacheError::Connection`] when the URL is invalid or no
    /// connection can be established within `connection_timeout`.
    pub async fn connect(config: &NetworkedCacheConfig) -> Result<Self, CacheError> {
        let client =
            Client::open(config.url.as_str()).map_err(|e| CacheError::Connection(e.to_string()))?;

        let pool = pool_builder(config)?
            .build(client)
            .await
            .map_err(|e| CacheError::Connection(e.to_string()))?;

        let store = Self {
            pool,
            namespace: config.key_prefix.clone(),
            scan_count: config.scan_count.max(1),
        };

        // Surface an unreachable server at startup rather than on first use.
        {
            let mut conn = store.get_conn().await?;
            let conn_ref: &mut MultiplexedConnection = &mut conn;
            let _pong: String = redis::cmd("PING")
                .query_async(conn_ref)
                .await
                .map_err(|e| CacheError::Connection(e.to_string()))?;
        }

        info!(
            namespace = %store.namespace,
            max_active = config.max_active,
            "Networked cache connected"
        );

        Ok(store)
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    fn prefixed_key(&self, key: &str) -> String {
        namespaced(&self.namespace, key)
    }

    async fn get_conn(&self) -> Result<PooledConnection<'_, Client>, CacheError> {
        self.pool.get().await.map_err(CacheError::from)
    }

    /// Walk the SCAN cursor to completion, collecting distinct matching keys.
    async fn scan_keys(&self, pattern: &str) -> Result<BTreeSet<String>, CacheError> {
        let mut keys = BTreeSet::new();
        let mut cursor: u64 = 0;

        loop {
            let mut conn = self.get_conn().await?;
            let conn_ref: &mut MultiplexedConnection = &mut conn;

            let (next, page): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(self.scan_count)
                .query_async(conn_ref)
                .await?;

            keys.extend(page);
            cursor = next;

            if cursor == 0 {
                break;
            }
        }

        Ok(keys)
    }
}

#[async_trait]
impl CacheBackend for NetworkedStore {
    fn name(&self) -> &'static str {
        "networked"
    }

    async fn has(&self, key: &str) -> Result<bool, CacheError> {
        let mut conn = self.get_conn().await?;
        let prefixed = self.prefixed_key(key);

        let conn_ref: &mut MultiplexedConnection = &mut conn;
        Ok(conn_ref.exists::<_, bool>(&prefixed).await?)
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, CacheError> {
        let mut conn = self.get_conn().await?;
        let prefixed = self.prefixed_key(key);

        let conn_ref: &mut MultiplexedConnection = &mut conn;
        let value: Option<Vec<u8>> = conn_ref.get(&prefixed).await?;

        debug!(key = %prefixed, hit = value.is_some(), "Networked cache get");
        value.ok_or_else(|| CacheError::not_found(key))
    }

    async fn set(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl_seconds: Option<u64>,
    ) -> Result<(), CacheError> {
        let mut conn = self.get_conn().await?;
        let prefixed = self.prefixed_key(key);

        let conn_ref: &mut MultiplexedConnection = &mut conn;
        match effective_ttl(ttl_seconds) {
            Some(ttl) => conn_ref.set_ex::<_, _, ()>(&prefixed, value, ttl).await?,
            None => conn_ref.set::<_, _, ()>(&prefixed, value).await?,
        }

        debug!(key = %prefixed, ttl = ?effective_ttl(ttl_seconds), "Networked cache set");
        Ok(())
    }

    async fn forget(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.get_conn().await?;
        let prefixed = self.prefixed_key(key);

        let conn_ref: &mut MultiplexedConnection = &mut conn;
        conn_ref.del::<_, ()>(&prefixed).await?;

        debug!(key = %prefixed, "Networked cache forget");
        Ok(())
    }

    async fn empty_matching(&self, prefix: &str) -> Result<(), CacheError> {
        let pattern = scan_pattern(&self.namespace, prefix);
        let keys: Vec<String> = self.scan_keys(&pattern).await?.into_iter().collect();

        let mut removed = 0usize;
        for chunk in keys.chunks(DELETE_CHUNK) {
            let mut conn = self.get_conn().await?;
            let conn_ref: &mut MultiplexedConnection = &mut conn;
            removed += conn_ref.del::<_, usize>(chunk).await?;
        }

        info!(%pattern, matched = keys.len(), removed, "Networked cache entries evicted");
        Ok(())
    }
}
