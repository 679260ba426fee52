//! Embedded cache backed by a local redb database.
//!
//! Every row carries its own deadline: the stored value is an 8-byte
//! big-endian unix-millisecond expiry (0 = never) followed by the encoded
//! entry. Expired rows are invisible to reads and are physically removed by
//! [`CacheBackend::maintain`].

use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use jiff::Timestamp;
use redb::{Database, Durability, ReadableTable, TableDefinition};
use tracing::{debug, info, warn};

use crate::cache::traits::effective_ttl;
use crate::cache::{CacheBackend, CacheError, MaintenanceReport};
use crate::config::EmbeddedCacheConfig;

const ENTRIES: TableDefinition<&str, &[u8]> = TableDefinition::new("entries");

const DATABASE_FILE: &str = "cache.redb";

const HEADER_LEN: usize = 8;

fn storage<E: Into<redb::Error>>(error: E) -> CacheError {
    CacheError::from(error.into())
}

fn now_millis() -> u64 {
    Timestamp::now().as_millisecond().max(0) as u64
}

fn deadline(ttl_seconds: Option<u64>) -> u64 {
    effective_ttl(ttl_seconds)
        .map(|ttl| now_millis().saturating_add(ttl.saturating_mul(1000)))
        .unwrap_or(0)
}

fn encode_record(expires_at: u64, payload: &[u8]) -> Vec<u8> {
    let mut record = Vec::with_capacity(HEADER_LEN + payload.len());
    record.extend_from_slice(&expires_at.to_be_bytes());
    record.extend_from_slice(payload);
    record
}

/// Split a stored row into its deadline and payload.
fn split_record(record: &[u8]) -> Option<(u64, &[u8])> {
    if record.len() < HEADER_LEN {
        return None;
    }
    let (header, payload) = record.split_at(HEADER_LEN);
    let mut deadline = [0u8; HEADER_LEN];
    deadline.copy_from_slice(header);
    Some((u64::from_be_bytes(deadline), payload))
}

fn is_expired(expires_at: u64, now: u64) -> bool {
    expires_at != 0 && expires_at <= now
}

/// Rows that can no longer be read: expired, or too short to hold a header.
fn is_stale(record: &[u8], now: u64) -> bool {
    match split_record(record) {
        Some((expires_at, _)) => is_expired(expires_at, now),
        None => true,
    }
}

/// Look up `key` and hand its live payload to `f`.
fn read_live<R>(
    db: &Database,
    key: &str,
    f: impl FnOnce(&[u8]) -> R,
) -> Result<Option<R>, CacheError> {
    let txn = db.begin_read().map_err(storage)?;
    let table = txn.open_table(ENTRIES).map_err(storage)?;

    let Some(guard) = table.get(key).map_err(storage)? else {
        return Ok(None);
    };

    let (expires_at, payload) = split_record(guard.value())
        .ok_or_else(|| CacheError::Operation(format!("corrupt record for key '{}'", key)))?;

    if is_expired(expires_at, now_millis()) {
        return Ok(None);
    }

    Ok(Some(f(payload)))
}

/// Delete `keys` in one write transaction, returning how many existed.
fn delete_batch(db: &Database, keys: &[String], durability: Durability) -> Result<u64, CacheError> {
    let mut txn = db.begin_write().map_err(storage)?;
    txn.set_durability(durability);

    let mut removed = 0u64;
    {
        let mut table = txn.open_table(ENTRIES).map_err(storage)?;
        for key in keys {
            if table.remove(key.as_str()).map_err(storage)?.is_some() {
                removed += 1;
            }
        }
    }

    txn.commit().map_err(storage)?;
    Ok(removed)
}

/// Delete the stale rows among `keys`, re-checking each inside the transaction.
fn purge_batch(db: &Database, keys: &[String]) -> Result<u64, CacheError> {
    let mut txn = db.begin_write().map_err(storage)?;
    txn.set_durability(Durability::Immediate);

    let now = now_millis();
    let mut purged = 0u64;
    {
        let mut table = txn.open_table(ENTRIES).map_err(storage)?;
        for key in keys {
            let stale = match table.get(key.as_str()).map_err(storage)? {
                Some(guard) => is_stale(guard.value(), now),
                None => false,
            };
            if stale {
                table.remove(key.as_str()).map_err(storage)?;
                purged += 1;
            }
        }
    }

    txn.commit().map_err(storage)?;
    Ok(purged)
}

/// Cache stored in a single redb file under a dedicated directory.
///
/// The database handle sits behind an `RwLock`: ordinary operations share the
/// read side (redb itself serializes writers and gives readers snapshots),
/// and compaction takes the write side because it needs exclusive access.
pub struct EmbeddedStore {
    db: Arc<RwLock<Database>>,
    path: PathBuf,
    delete_batch_size: usize,
    sync_writes: bool,
}

impl EmbeddedStore {
    /// Open (or create) `<directory>/cache.redb`.
    ///
    /// Fails with [`CacheError::Connection`] when the directory cannot be
    /// created or the file is locked by another process.
    pub async fn open(config: &EmbeddedCacheConfig) -> Result<Self, CacheError> {
        let directory = PathBuf::from(&config.directory);
        let path = directory.join(DATABASE_FILE);

        let open_path = path.clone();
        let db = tokio::task::spawn_blocking(move || -> Result<Database, CacheError> {
            std::fs::create_dir_all(&directory).map_err(|e| {
                CacheError::Connection(format!(
                    "failed to create cache directory {}: {}",
                    directory.display(),
                    e
                ))
            })?;

            let db = Database::create(&open_path).map_err(storage)?;

            let txn = db.begin_write().map_err(storage)?;
            txn.open_table(ENTRIES).map_err(storage)?;
            txn.commit().map_err(storage)?;

            Ok(db)
        })
        .await
        .map_err(|e| CacheError::Connection(format!("open task failed: {}", e)))??;

        info!(path = %path.display(), "Embedded cache opened");

        Ok(Self {
            db: Arc::new(RwLock::new(db)),
            path,
            delete_batch_size: config.delete_batch_size.max(1),
            sync_writes: config.sync_writes,
        })
    }

    /// Location of the database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn durability(&self) -> Durability {
        if self.sync_writes {
            Durability::Immediate
        } else {
            Durability::None
        }
    }

    /// Run `f` against the shared database handle on the blocking pool.
    async fn with_db<F, R>(&self, f: F) -> Result<R, CacheError>
    where
        F: FnOnce(&Database) -> Result<R, CacheError> + Send + 'static,
        R: Send + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || {
            let guard = db
                .read()
                .map_err(|_| CacheError::Operation("database lock poisoned".to_string()))?;
            f(&guard)
        })
        .await
        .map_err(|e| CacheError::Operation(format!("blocking task failed: {}", e)))?
    }

    async fn purge_expired(&self) -> Result<u64, CacheError> {
        let batch_size = self.delete_batch_size;

        self.with_db(move |db| {
            let txn = db.begin_read().map_err(storage)?;
            let table = txn.open_table(ENTRIES).map_err(storage)?;

            let now = now_millis();
            let mut batch = Vec::new();
            let mut purged = 0u64;

            for item in table.iter().map_err(storage)? {
                let (key, record) = item.map_err(storage)?;
                if !is_stale(record.value(), now) {
                    continue;
                }
                batch.push(key.value().to_string());
                if batch.len() >= batch_size {
                    purged += purge_batch(db, &batch)?;
                    batch.clear();
                }
            }

            if !batch.is_empty() {
                purged += purge_batch(db, &batch)?;
            }

            Ok(purged)
        })
        .await
    }

    async fn compact(&self) -> Result<bool, CacheError> {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || {
            let mut guard = db
                .write()
                .map_err(|_| CacheError::Operation("database lock poisoned".to_string()))?;
            guard.compact().map_err(storage)
        })
        .await
        .map_err(|e| CacheError::Operation(format!("compaction task failed: {}", e)))?
    }
}

#[async_trait]
impl CacheBackend for EmbeddedStore {
    fn name(&self) -> &'static str {
        "embedded"
    }

    async fn has(&self, key: &str) -> Result<bool, CacheError> {
        let key = key.to_string();
        let found = self
            .with_db(move |db| read_live(db, &key, |_| ()))
            .await?;
        Ok(found.is_some())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, CacheError> {
        let owned = key.to_string();
        let payload = self
            .with_db(move |db| read_live(db, &owned, |payload| payload.to_vec()))
            .await?;

        debug!(key, hit = payload.is_some(), "Embedded cache get");
        payload.ok_or_else(|| CacheError::not_found(key))
    }

    async fn set(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl_seconds: Option<u64>,
    ) -> Result<(), CacheError> {
        let owned = key.to_string();
        let record = encode_record(deadline(ttl_seconds), &value);
        let durability = self.durability();

        self.with_db(move |db| {
            let mut txn = db.begin_write().map_err(storage)?;
            txn.set_durability(durability);
            {
                let mut table = txn.open_table(ENTRIES).map_err(storage)?;
                table
                    .insert(owned.as_str(), record.as_slice())
                    .map_err(storage)?;
            }
            txn.commit().map_err(storage)
        })
        .await?;

        debug!(key, ttl = ?effective_ttl(ttl_seconds), "Embedded cache set");
        Ok(())
    }

    async fn forget(&self, key: &str) -> Result<(), CacheError> {
        let keys = vec![key.to_string()];
        let durability = self.durability();
        self.with_db(move |db| delete_batch(db, &keys, durability))
            .await?;

        debug!(key, "Embedded cache forget");
        Ok(())
    }

    async fn empty_matching(&self, prefix: &str) -> Result<(), CacheError> {
        let owned = prefix.to_string();
        let batch_size = self.delete_batch_size;
        let durability = self.durability();

        let removed = self
            .with_db(move |db| {
                let txn = db.begin_read().map_err(storage)?;
                let table = txn.open_table(ENTRIES).map_err(storage)?;

                let mut batch: Vec<String> = Vec::new();
                let mut removed = 0u64;

                for item in table.range::<&str>(owned.as_str()..).map_err(storage)? {
                    let (guard, _) = item.map_err(storage)?;
                    let key = guard.value();
                    if !key.starts_with(owned.as_str()) {
                        break;
                    }
                    batch.push(key.to_string());

                    if batch.len() >= batch_size {
                        removed += delete_batch(db, &batch, durability)?;
                        batch.clear();
                    }
                }

                if !batch.is_empty() {
                    removed += delete_batch(db, &batch, durability)?;
                }

                Ok(removed)
            })
            .await?;

        info!(prefix, removed, "Embedded cache entries evicted");
        Ok(())
    }

    async fn maintain(&self) -> Result<MaintenanceReport, CacheError> {
        let expired_purged = self.purge_expired().await?;

        let compacted = self.compact().await.inspect_err(|e| {
            warn!(error = %e, "Embedded cache compaction failed");
        })?;

        info!(expired_purged, compacted, "Embedded cache maintenance finished");
        Ok(MaintenanceReport {
            expired_purged,
            compacted,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn open_store(dir: &TempDir, delete_batch_size: usize) -> EmbeddedStore {
        let config = EmbeddedCacheConfig {
            directory: dir.path().join("cache").to_string_lossy().into_owned(),
            delete_batch_size,
            sync_writes: false,
        };
        EmbeddedStore::open(&config).await.unwrap()
    }

    /// Write `record` verbatim, header included.
    fn put_bytes(store: &EmbeddedStore, key: &str, record: &[u8]) {
        let db = store.db.read().unwrap();
        let txn = db.begin_write().unwrap();
        {
            let mut table = txn.open_table(ENTRIES).unwrap();
            table.insert(key, record).unwrap();
        }
        txn.commit().unwrap();
    }

    /// Write a row with an explicit deadline, bypassing the TTL arithmetic.
    fn put_raw(store: &EmbeddedStore, key: &str, expires_at: u64, payload: &[u8]) {
        put_bytes(store, key, &encode_record(expires_at, payload));
    }

    #[test]
    fn test_record_layout() {
        let record = encode_record(0x0102_0304_0506_0708, b"payload");
        assert_eq!(&record[..HEADER_LEN], &[1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(split_record(&record), Some((0x0102_0304_0506_0708, &b"payload"[..])));
        assert_eq!(split_record(b"short"), None);
    }

    #[test]
    fn test_deadline_zero_means_forever() {
        assert_eq!(deadline(None), 0);
        assert_eq!(deadline(Some(0)), 0);
        assert!(!is_expired(0, u64::MAX));
        assert!(deadline(Some(60)) > now_millis());
    }

    #[test]
    fn test_stale_rows() {
        assert!(is_stale(&encode_record(1, b"x"), 2));
        assert!(!is_stale(&encode_record(0, b"x"), 2));
        assert!(!is_stale(&encode_record(10, b"x"), 2));
        assert!(is_stale(b"abc", 2));
    }

    #[tokio::test]
    async fn test_open_creates_database_file() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir, 10).await;
        assert!(store.path().ends_with("cache.redb"));
        assert!(store.path().exists());
    }

    #[tokio::test]
    async fn test_set_get_has_forget() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir, 10).await;

        store.set("user:1", b"alice".to_vec(), None).await.unwrap();
        assert!(store.has("user:1").await.unwrap());
        assert_eq!(store.get("user:1").await.unwrap(), b"alice");

        store.set("user:1", b"bob".to_vec(), Some(0)).await.unwrap();
        assert_eq!(store.get("user:1").await.unwrap(), b"bob");

        store.forget("user:1").await.unwrap();
        assert!(!store.has("user:1").await.unwrap());
        assert!(store.get("user:1").await.unwrap_err().is_not_found());

        // forgetting an absent key succeeds
        store.forget("user:1").await.unwrap();
    }

    #[tokio::test]
    async fn test_expired_row_is_invisible() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir, 10).await;

        put_raw(&store, "gone", 1, b"old");
        put_raw(&store, "kept", now_millis() + 60_000, b"new");

        assert!(!store.has("gone").await.unwrap());
        assert!(store.get("gone").await.unwrap_err().is_not_found());
        assert_eq!(store.get("kept").await.unwrap(), b"new");
    }

    #[tokio::test]
    async fn test_corrupt_row_is_an_error_not_a_miss() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir, 10).await;

        put_bytes(&store, "torn", b"abc");

        let err = store.has("torn").await.unwrap_err();
        assert!(!err.is_not_found());
        assert!(err.is_transport());

        let err = store.get("torn").await.unwrap_err();
        assert!(!err.is_not_found());

        // maintenance clears it, after which it reads as absent
        let report = store.maintain().await.unwrap();
        assert_eq!(report.expired_purged, 1);
        assert!(!store.has("torn").await.unwrap());
    }

    #[tokio::test]
    async fn test_empty_matching_spans_batches() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir, 3).await;

        for i in 0..10 {
            store.set(&format!("a:{i}"), vec![1], None).await.unwrap();
        }
        store.set("a", vec![2], None).await.unwrap();
        store.set("b:0", vec![3], None).await.unwrap();
        store.set("`", vec![4], None).await.unwrap();

        store.empty_matching("a:").await.unwrap();

        for i in 0..10 {
            assert!(!store.has(&format!("a:{i}")).await.unwrap());
        }
        assert!(store.has("a").await.unwrap());
        assert!(store.has("b:0").await.unwrap());
        assert!(store.has("`").await.unwrap());
    }

    #[tokio::test]
    async fn test_empty_removes_everything() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir, 2).await;

        for key in ["x", "y:1", "z:z:z", ""] {
            store.set(key, vec![0], None).await.unwrap();
        }

        store.empty().await.unwrap();

        for key in ["x", "y:1", "z:z:z", ""] {
            assert!(!store.has(key).await.unwrap());
        }
    }

    #[tokio::test]
    async fn test_maintain_purges_only_expired_rows() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir, 2).await;

        for i in 0..5 {
            put_raw(&store, &format!("expired:{i}"), 1, b"x");
        }
        store.set("live", b"y".to_vec(), Some(3600)).await.unwrap();
        store.set("forever", b"z".to_vec(), None).await.unwrap();

        let report = store.maintain().await.unwrap();
        assert_eq!(report.expired_purged, 5);

        assert_eq!(store.get("live").await.unwrap(), b"y");
        assert_eq!(store.get("forever").await.unwrap(), b"z");

        let second = store.maintain().await.unwrap();
        assert_eq!(second.expired_purged, 0);
    }

    #[tokio::test]
    async fn test_second_open_of_same_file_fails() {
        let dir = TempDir::new().unwrap();
        let _store = open_store(&dir, 10).await;

        let config = EmbeddedCacheConfig {
            directory: dir.path().join("cache").to_string_lossy().into_owned(),
            ..EmbeddedCacheConfig::default()
        };
        let err = EmbeddedStore::open(&config).await.err().unwrap();
        assert!(matches!(err, CacheError::Connection(_)));
    }
}
