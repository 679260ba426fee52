//! Sessions persisted through the cache.
//!
//! A session lives under `"{key_prefix}{id}"` and expires after the
//! configured lifetime. Saving a session refreshes that lifetime.

use std::collections::BTreeMap;

use jiff::Timestamp;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::cache::{Cache, CacheError};
use crate::config::SessionConfig;

/// One user session and its attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub data: BTreeMap<String, Value>,
    pub created_at: Timestamp,
}

impl Session {
    fn new() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            data: BTreeMap::new(),
            created_at: Timestamp::now(),
        }
    }

    /// Read attribute `key`, or `None` when absent or of another shape.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.data
            .get(key)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }

    pub fn insert<T: Serialize>(&mut self, key: impl Into<String>, value: &T) -> Result<(), CacheError> {
        let value = serde_json::to_value(value)?;
        self.data.insert(key.into(), value);
        Ok(())
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.data.remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }
}

/// Loads and stores [`Session`]s in a [`Cache`].
#[derive(Debug, Clone)]
pub struct SessionStore {
    cache: Cache,
    key_prefix: String,
    lifetime_seconds: u64,
}

impl SessionStore {
    pub fn new(cache: Cache, config: &SessionConfig) -> Self {
        Self {
            cache,
            key_prefix: config.key_prefix.clone(),
            lifetime_seconds: config.lifetime_minutes.saturating_mul(60),
        }
    }

    fn key_for(&self, id: &str) -> String {
        format!("{}{}", self.key_prefix, id)
    }

    /// A fresh, unsaved session with a random id.
    pub fn create(&self) -> Session {
        Session::new()
    }

    /// Load session `id`; `Ok(None)` when it does not exist or has expired.
    pub async fn load(&self, id: &str) -> Result<Option<Session>, CacheError> {
        match self.cache.get::<Session>(&self.key_for(id)).await {
            Ok(session) => Ok(Some(session)),
            Err(CacheError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Persist `session`, restarting its lifetime.
    pub async fn save(&self, session: &Session) -> Result<(), CacheError> {
        self.cache
            .set(&self.key_for(&session.id), session, Some(self.lifetime_seconds))
            .await
    }

    pub async fn destroy(&self, id: &str) -> Result<(), CacheError> {
        self.cache.forget(&self.key_for(id)).await
    }

    /// Move `session` to a new id, dropping the old entry.
    pub async fn renew(&self, session: &mut Session) -> Result<(), CacheError> {
        let old_id = std::mem::replace(&mut session.id, Uuid::new_v4().to_string());
        self.save(session).await?;
        self.destroy(&old_id).await
    }

    /// Remove every session.
    pub async fn destroy_all(&self) -> Result<(), CacheError> {
        self.cache.empty_matching(&self.key_prefix).await
    }
}
