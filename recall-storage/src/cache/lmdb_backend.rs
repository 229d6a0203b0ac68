//! LMDB-backed cache store with namespace isolation.
//!
//! Uses the heed crate (Rust bindings for LMDB) to provide a persistent,
//! memory-mapped key-value store for memoized results.
//!
//! # Namespace Isolation
//!
//! All operations go through `ScopedKey`, so:
//! - Stores with different namespaces never see each other's entries
//! - `clear()` only removes the calling store's namespace
//!
//! # Value Format
//!
//! `[expires_at: 8 bytes, i64 LE unix millis][json value]`, with `i64::MAX`
//! for entries that never expire.

use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};
use recall_core::{ConfigError, RecallError, RecallResult, StoreError};
use serde_json::Value;

use super::expiry::Expiry;
use super::scoped_key::{ScopedKey, MAX_NAMESPACE_BYTES};
use super::traits::{CacheStats, CacheStore};

/// Environment variable holding the LMDB directory.
pub const ENV_LMDB_PATH: &str = "RECALL_LMDB_PATH";

/// Environment variable holding the LMDB map size in megabytes.
pub const ENV_LMDB_MAX_SIZE_MB: &str = "RECALL_LMDB_MAX_SIZE_MB";

/// Environment variable holding the store namespace.
pub const ENV_LMDB_NAMESPACE: &str = "RECALL_LMDB_NAMESPACE";

const DEFAULT_MAX_SIZE_MB: usize = 64;
const DEFAULT_NAMESPACE: &str = "recall";
const HEADER_LEN: usize = 8;
const BYTES_PER_MB: usize = 1024 * 1024;

/// Map size in bytes, or `None` when it does not fit in `usize`.
fn map_size_bytes(max_size_mb: usize) -> Option<usize> {
    max_size_mb.checked_mul(BYTES_PER_MB)
}

fn validate_namespace(namespace: &str) -> RecallResult<()> {
    if namespace.is_empty() {
        return Err(ConfigError::InvalidValue {
            field: "namespace".to_string(),
            value: String::new(),
            reason: "namespace must not be empty".to_string(),
        }
        .into());
    }

    if namespace.len() > MAX_NAMESPACE_BYTES {
        return Err(ConfigError::InvalidValue {
            field: "namespace".to_string(),
            value: namespace.to_string(),
            reason: format!("namespace must be at most {} bytes", MAX_NAMESPACE_BYTES),
        }
        .into());
    }

    Ok(())
}

/// Error type for LMDB store operations.
#[derive(Debug, thiserror::Error)]
pub enum LmdbStoreError {
    /// Failed to open or create the LMDB environment.
    #[error("Failed to open LMDB environment: {0}")]
    EnvOpen(String),

    /// Failed to open the database within the environment.
    #[error("Failed to open database: {0}")]
    DbOpen(String),

    /// Transaction error.
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// Serialization error.
    #[error("Serialization error for {key}: {reason}")]
    Serialization { key: String, reason: String },

    /// Deserialization error.
    #[error("Deserialization error for {key}: {reason}")]
    Deserialization { key: String, reason: String },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<LmdbStoreError> for StoreError {
    fn from(e: LmdbStoreError) -> Self {
        match e {
            LmdbStoreError::Serialization { key, reason } => {
                StoreError::Serialization { key, reason }
            }
            LmdbStoreError::Deserialization { key, reason } => {
                StoreError::Deserialization { key, reason }
            }
            LmdbStoreError::EnvOpen(reason)
            | LmdbStoreError::DbOpen(reason) => StoreError::Unavailable {
                backend: "lmdb".to_string(),
                reason,
            },
            LmdbStoreError::Io(e) => StoreError::Unavailable {
                backend: "lmdb".to_string(),
                reason: e.to_string(),
            },
            LmdbStoreError::Transaction(reason) => StoreError::Transaction { reason },
        }
    }
}

impl From<LmdbStoreError> for RecallError {
    fn from(e: LmdbStoreError) -> Self {
        RecallError::Store(e.into())
    }
}

/// Where and how to open an [`LmdbStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LmdbStoreConfig {
    /// Directory holding the LMDB files. Created if missing.
    pub path: PathBuf,
    /// Maximum size of the memory map in megabytes.
    pub max_size_mb: usize,
    /// Namespace every key of this store is scoped under.
    pub namespace: String,
}

impl LmdbStoreConfig {
    /// Configuration for `path` with default size and namespace.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            max_size_mb: DEFAULT_MAX_SIZE_MB,
            namespace: DEFAULT_NAMESPACE.to_string(),
        }
    }

    /// Set the map size.
    pub fn with_max_size_mb(mut self, max_size_mb: usize) -> Self {
        self.max_size_mb = max_size_mb;
        self
    }

    /// Set the namespace.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `RECALL_LMDB_PATH`: LMDB directory (required)
    /// - `RECALL_LMDB_MAX_SIZE_MB`: map size in MB (default: 64)
    /// - `RECALL_LMDB_NAMESPACE`: key namespace (default: "recall")
    pub fn from_env() -> RecallResult<Self> {
        let path = std::env::var(ENV_LMDB_PATH).map_err(|_| ConfigError::MissingRequired {
            field: ENV_LMDB_PATH.to_string(),
        })?;

        let max_size_mb = match std::env::var(ENV_LMDB_MAX_SIZE_MB) {
            Ok(raw) => raw.trim().parse::<usize>().map_err(|e| ConfigError::InvalidValue {
                field: ENV_LMDB_MAX_SIZE_MB.to_string(),
                value: raw.clone(),
                reason: e.to_string(),
            })?,
            Err(_) => DEFAULT_MAX_SIZE_MB,
        };

        let namespace =
            std::env::var(ENV_LMDB_NAMESPACE).unwrap_or_else(|_| DEFAULT_NAMESPACE.to_string());

        let config = Self {
            path: PathBuf::from(path),
            max_size_mb,
            namespace,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// Validates:
    /// - path is non-empty
    /// - max_size_mb is positive and its byte size fits in `usize`
    /// - namespace is non-empty and short enough for every key to fit in LMDB
    pub fn validate(&self) -> RecallResult<()> {
        if self.path.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "path".to_string(),
                value: String::new(),
                reason: "path must not be empty".to_string(),
            }
            .into());
        }

        if self.max_size_mb == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_size_mb".to_string(),
                value: "0".to_string(),
                reason: "max_size_mb must be positive".to_string(),
            }
            .into());
        }

        if map_size_bytes(self.max_size_mb).is_none() {
            return Err(ConfigError::InvalidValue {
                field: "max_size_mb".to_string(),
                value: self.max_size_mb.to_string(),
                reason: "max_size_mb overflows the address space".to_string(),
            }
            .into());
        }

        validate_namespace(&self.namespace)
    }
}

/// Persistent cache store on LMDB.
///
/// # Example
///
/// ```ignore
/// use recall_storage::{CacheStore, LmdbStore, LmdbStoreConfig};
///
/// let store = LmdbStore::open(&LmdbStoreConfig::new("/tmp/recall"))?;
/// store.set("app:add(1,2)", json!(3), Some(Duration::from_secs(60))).await?;
/// ```
pub struct LmdbStore {
    env: Env,
    db: Database<Bytes, Bytes>,
    namespace: String,
    stats: Arc<RwLock<CacheStats>>,
}

impl std::fmt::Debug for LmdbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LmdbStore")
            .field("path", &self.env.path())
            .field("namespace", &self.namespace)
            .finish()
    }
}

impl LmdbStore {
    /// Open a store from validated configuration.
    pub fn open(config: &LmdbStoreConfig) -> RecallResult<Self> {
        config.validate()?;
        Ok(Self::new(&config.path, config.max_size_mb, &config.namespace)?)
    }

    /// Open (or create) the LMDB environment at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The directory cannot be created
    /// - `max_size_mb` megabytes overflow `usize`
    /// - LMDB environment cannot be opened
    /// - Database cannot be created
    pub fn new<P: AsRef<Path>>(
        path: P,
        max_size_mb: usize,
        namespace: &str,
    ) -> Result<Self, LmdbStoreError> {
        let map_size = map_size_bytes(max_size_mb).ok_or_else(|| {
            LmdbStoreError::EnvOpen(format!("map size of {} MB overflows usize", max_size_mb))
        })?;

        std::fs::create_dir_all(&path)?;

        // SAFETY: the environment is opened once per path by this process.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size)
                .max_dbs(1)
                .open(path.as_ref())
        }
        .map_err(|e| LmdbStoreError::EnvOpen(e.to_string()))?;

        let mut wtxn = env
            .write_txn()
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;

        let db: Database<Bytes, Bytes> = env
            .create_database(&mut wtxn, None)
            .map_err(|e| LmdbStoreError::DbOpen(e.to_string()))?;

        wtxn.commit()
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;

        tracing::debug!(path = %path.as_ref().display(), namespace, "Opened LMDB store");

        Ok(Self {
            env,
            db,
            namespace: namespace.to_string(),
            stats: Arc::new(RwLock::new(CacheStats::default())),
        })
    }

    /// Another store over the same environment under a different namespace.
    ///
    /// LMDB allows one environment per path per process, so stores sharing
    /// files must be derived from each other.
    pub fn with_namespace(&self, namespace: impl Into<String>) -> RecallResult<Self> {
        let namespace = namespace.into();
        validate_namespace(&namespace)?;
        Ok(Self {
            env: self.env.clone(),
            db: self.db,
            namespace,
            stats: Arc::new(RwLock::new(CacheStats::default())),
        })
    }

    /// Namespace of this store.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    fn scoped(&self, key: &str) -> ScopedKey {
        ScopedKey::new(&self.namespace, key)
    }

    fn record(&self, f: impl FnOnce(&mut CacheStats)) {
        let mut stats = self.stats.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut stats);
    }

    fn encode(key: &str, value: &Value, expiry: Expiry) -> Result<Vec<u8>, LmdbStoreError> {
        let value_bytes = serde_json::to_vec(value).map_err(|e| LmdbStoreError::Serialization {
            key: key.to_string(),
            reason: e.to_string(),
        })?;

        let mut full_bytes = Vec::with_capacity(HEADER_LEN + value_bytes.len());
        full_bytes.extend_from_slice(&expiry.to_millis().to_le_bytes());
        full_bytes.extend_from_slice(&value_bytes);
        Ok(full_bytes)
    }

    fn decode(key: &str, bytes: &[u8]) -> Result<(Expiry, Value), LmdbStoreError> {
        let header: [u8; HEADER_LEN] = bytes
            .get(..HEADER_LEN)
            .and_then(|h| h.try_into().ok())
            .ok_or_else(|| LmdbStoreError::Deserialization {
                key: key.to_string(),
                reason: "entry shorter than expiry header".to_string(),
            })?;
        let expiry = Expiry::from_millis(i64::from_le_bytes(header));

        let value = serde_json::from_slice(&bytes[HEADER_LEN..]).map_err(|e| {
            LmdbStoreError::Deserialization {
                key: key.to_string(),
                reason: e.to_string(),
            }
        })?;
        Ok((expiry, value))
    }

    /// Keys of this namespace, plain and hashed.
    fn collect_namespace_keys(&self) -> Result<Vec<Vec<u8>>, LmdbStoreError> {
        let rtxn = self
            .env
            .read_txn()
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;

        let iter = self
            .db
            .iter(&rtxn)
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;

        let mut keys = Vec::new();
        for result in iter {
            let (key, _) = result.map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;
            if ScopedKey::in_namespace(key, &self.namespace) {
                keys.push(key.to_vec());
            }
        }
        Ok(keys)
    }

    /// Delete `scoped` if it is still expired as of `now`.
    fn evict_if_expired(
        &self,
        key: &str,
        scoped: &ScopedKey,
        now: chrono::DateTime<Utc>,
    ) -> Result<bool, LmdbStoreError> {
        let mut wtxn = self
            .env
            .write_txn()
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;

        let still_expired = match self
            .db
            .get(&wtxn, scoped.as_bytes())
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?
        {
            Some(bytes) => Self::decode(key, bytes)
                .map(|(expiry, _)| expiry.is_expired(now))
                .unwrap_or(true),
            None => false,
        };

        if still_expired {
            self.db
                .delete(&mut wtxn, scoped.as_bytes())
                .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;
        }

        wtxn.commit()
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;
        Ok(still_expired)
    }
}

#[async_trait]
impl CacheStore for LmdbStore {
    fn name(&self) -> &'static str {
        "lmdb"
    }

    async fn get(&self, key: &str) -> RecallResult<Option<Value>> {
        let scoped = self.scoped(key);
        let now = Utc::now();

        let entry = {
            let rtxn = self
                .env
                .read_txn()
                .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;

            match self
                .db
                .get(&rtxn, scoped.as_bytes())
                .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?
            {
                Some(bytes) => Some(Self::decode(key, bytes)?),
                None => None,
            }
        };

        match entry {
            Some((expiry, value)) if !expiry.is_expired(now) => {
                self.record(|stats| stats.hits += 1);
                Ok(Some(value))
            }
            Some(_) => {
                if self.evict_if_expired(key, &scoped, now)? {
                    tracing::debug!(key, namespace = %self.namespace, "Evicted expired entry");
                    self.record(|stats| {
                        stats.evictions += 1;
                        stats.entry_count = stats.entry_count.saturating_sub(1);
                    });
                }
                self.record(|stats| stats.misses += 1);
                Ok(None)
            }
            None => {
                self.record(|stats| stats.misses += 1);
                Ok(None)
            }
        }
    }

    async fn set(&self, key: &str, value: Value, ttl: Option<Duration>) -> RecallResult<()> {
        let scoped = self.scoped(key);
        let full_bytes = Self::encode(key, &value, Expiry::from_ttl(ttl, Utc::now()))?;

        let mut wtxn = self
            .env
            .write_txn()
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;

        let is_new = self
            .db
            .get(&wtxn, scoped.as_bytes())
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?
            .is_none();

        self.db
            .put(&mut wtxn, scoped.as_bytes(), &full_bytes)
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;

        wtxn.commit()
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;

        self.record(|stats| {
            stats.writes += 1;
            if is_new {
                stats.entry_count += 1;
            }
        });
        Ok(())
    }

    async fn delete(&self, key: &str) -> RecallResult<bool> {
        let scoped = self.scoped(key);

        let mut wtxn = self
            .env
            .write_txn()
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;

        let deleted = self
            .db
            .delete(&mut wtxn, scoped.as_bytes())
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;

        wtxn.commit()
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;

        if deleted {
            self.record(|stats| stats.entry_count = stats.entry_count.saturating_sub(1));
        }
        Ok(deleted)
    }

    async fn clear(&self) -> RecallResult<u64> {
        let keys_to_delete = self.collect_namespace_keys()?;

        let mut wtxn = self
            .env
            .write_txn()
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;

        let mut deleted = 0u64;
        for key in &keys_to_delete {
            if self
                .db
                .delete(&mut wtxn, key)
                .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?
            {
                deleted += 1;
            }
        }

        wtxn.commit()
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;

        tracing::debug!(deleted, namespace = %self.namespace, "Cleared LMDB namespace");
        self.record(|stats| stats.entry_count = 0);
        Ok(deleted)
    }

    async fn stats(&self) -> RecallResult<CacheStats> {
        Ok(self
            .stats
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn create_test_store() -> (LmdbStore, TempDir) {
        let temp_dir = TempDir::new().expect("TempDir creation should succeed");
        let store = LmdbStore::open(&LmdbStoreConfig::new(temp_dir.path()).with_max_size_mb(10))
            .expect("store creation should succeed");
        (store, temp_dir)
    }

    #[tokio::test]
    async fn test_set_and_get() {
        let (store, _temp_dir) = create_test_store();

        store
            .set("app:add(1,2)", json!(3), None)
            .await
            .expect("set should succeed");
        let cached = store.get("app:add(1,2)").await.expect("get should succeed");
        assert_eq!(cached, Some(json!(3)));

        let missing = store.get("app:add(2,2)").await.expect("get should succeed");
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_stored_null_is_a_hit() {
        let (store, _temp_dir) = create_test_store();

        store
            .set("k", Value::Null, None)
            .await
            .expect("set should succeed");
        assert_eq!(
            store.get("k").await.expect("get should succeed"),
            Some(Value::Null)
        );
    }

    #[tokio::test]
    async fn test_ttl_expiry_deletes_entry() {
        let (store, _temp_dir) = create_test_store();

        store
            .set("k", json!("v"), Some(Duration::from_millis(50)))
            .await
            .expect("set should succeed");
        assert!(store.get("k").await.expect("get should succeed").is_some());

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(store.get("k").await.expect("get should succeed").is_none());

        // Physically removed, not just hidden.
        assert!(!store.delete("k").await.expect("delete should succeed"));
        assert_eq!(store.stats().await.expect("stats").evictions, 1);
    }

    #[tokio::test]
    async fn test_long_keys_are_stored() {
        let (store, _temp_dir) = create_test_store();
        let long_key = format!("search({})", json!("q".repeat(2000)));

        store
            .set(&long_key, json!([1, 2]), None)
            .await
            .expect("set should succeed");
        assert_eq!(
            store.get(&long_key).await.expect("get should succeed"),
            Some(json!([1, 2]))
        );
    }

    #[tokio::test]
    async fn test_overwrite() {
        let (store, _temp_dir) = create_test_store();

        store.set("k", json!(1), None).await.expect("set should succeed");
        store.set("k", json!(2), None).await.expect("set should succeed");

        assert_eq!(store.get("k").await.expect("get should succeed"), Some(json!(2)));
        assert_eq!(store.stats().await.expect("stats").entry_count, 1);
    }

    #[tokio::test]
    async fn test_namespace_isolation() {
        let (store_a, _temp_dir) = create_test_store();
        let store_b = store_a
            .with_namespace("other")
            .expect("namespace should be valid");

        store_a.set("k", json!("a"), None).await.expect("set should succeed");
        assert!(store_b.get("k").await.expect("get should succeed").is_none());

        store_b.set("k", json!("b"), None).await.expect("set should succeed");
        store_b
            .set(&"x".repeat(800), json!("long"), None)
            .await
            .expect("set should succeed");

        let cleared = store_b.clear().await.expect("clear should succeed");
        assert_eq!(cleared, 2);
        assert_eq!(
            store_a.get("k").await.expect("get should succeed"),
            Some(json!("a")),
            "clearing one namespace must not touch another"
        );
    }

    #[tokio::test]
    async fn test_stats() {
        let (store, _temp_dir) = create_test_store();

        let _ = store.get("k").await;
        store.set("k", json!(1), None).await.expect("set should succeed");
        let _ = store.get("k").await;
        let _ = store.get("k").await;

        let stats = store.stats().await.expect("stats should succeed");
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.writes, 1);
        assert_eq!(stats.entry_count, 1);
    }

    #[test]
    fn test_corrupt_entry_is_an_error() {
        let err = LmdbStore::decode("k", &[1, 2, 3]).unwrap_err();
        assert!(matches!(err, LmdbStoreError::Deserialization { .. }));

        let recall: RecallError = err.into();
        assert!(matches!(
            recall,
            RecallError::Store(StoreError::Deserialization { .. })
        ));
    }

    #[tokio::test]
    async fn test_floats_read_back_exactly() {
        let (store, _temp_dir) = create_test_store();

        let mut floats = vec![
            2.291712365432881e-9,
            0.1,
            1.0 / 3.0,
            f64::MAX,
            f64::MIN_POSITIVE,
            5e-324,
            -123456.789e-200,
        ];
        let mut state: u64 = 0x9E37_79B9_7F4A_7C15;
        while floats.len() < 2000 {
            state = state
                .wrapping_mul(6_364_136_223_846_793_005)
                .wrapping_add(1_442_695_040_888_963_407);
            let x = f64::from_bits(state);
            if x.is_finite() && x != 0.0 {
                floats.push(x);
            }
        }

        for (i, x) in floats.iter().enumerate() {
            let key = format!("f({})", i);
            store
                .set(&key, json!(x), None)
                .await
                .expect("set should succeed");
            let cached = store
                .get(&key)
                .await
                .expect("get should succeed")
                .and_then(|v| v.as_f64())
                .expect("stored float should read back");
            assert_eq!(cached.to_bits(), x.to_bits(), "float {:e} changed in storage", x);
        }
    }

    #[test]
    fn test_map_size_overflow_is_rejected() {
        let temp_dir = TempDir::new().expect("TempDir creation should succeed");
        let config = LmdbStoreConfig::new(temp_dir.path()).with_max_size_mb(usize::MAX / 1024);

        match config.validate() {
            Err(RecallError::Config(ConfigError::InvalidValue { field, .. })) => {
                assert_eq!(field, "max_size_mb");
            }
            other => panic!("expected InvalidValue for max_size_mb, got {:?}", other),
        }
        assert!(LmdbStore::open(&config).is_err());

        let err = LmdbStore::new(temp_dir.path(), usize::MAX, "recall").unwrap_err();
        assert!(matches!(err, LmdbStoreError::EnvOpen(_)));
    }

    #[tokio::test]
    async fn test_namespace_length_is_bounded() {
        let longest = "n".repeat(MAX_NAMESPACE_BYTES);
        assert!(LmdbStoreConfig::new("/tmp/x")
            .with_namespace(longest.clone())
            .validate()
            .is_ok());

        let too_long = "n".repeat(MAX_NAMESPACE_BYTES + 1);
        match LmdbStoreConfig::new("/tmp/x")
            .with_namespace(too_long.clone())
            .validate()
        {
            Err(RecallError::Config(ConfigError::InvalidValue { field, .. })) => {
                assert_eq!(field, "namespace");
            }
            other => panic!("expected InvalidValue for namespace, got {:?}", other),
        }

        let (store, _temp_dir) = create_test_store();
        assert!(store.with_namespace(too_long).is_err());

        // Oversized keys still fit under the longest accepted namespace.
        let wide = store
            .with_namespace(longest)
            .expect("namespace should be valid");
        let key = "k".repeat(2000);
        wide.set(&key, json!("v"), None)
            .await
            .expect("set should succeed");
        assert_eq!(
            wide.get(&key).await.expect("get should succeed"),
            Some(json!("v"))
        );
    }

    #[tokio::test]
    async fn test_stats_survive_poisoned_lock() {
        let (store, _temp_dir) = create_test_store();

        let stats = Arc::clone(&store.stats);
        let _ = std::thread::spawn(move || {
            let _guard = stats.write().expect("lock should not be poisoned yet");
            panic!("stats writer panicked");
        })
        .join();
        assert!(store.stats.is_poisoned());

        store.set("k", json!(1), None).await.expect("set should succeed");
        let _ = store.get("k").await.expect("get should succeed");

        let stats = store.stats().await.expect("stats should succeed");
        assert_eq!(stats.writes, 1);
        assert_eq!(stats.hits, 1);
    }

    struct EnvVarGuard {
        key: &'static str,
        original: Option<String>,
    }

    impl EnvVarGuard {
        fn set(key: &'static str, value: Option<&str>) -> Self {
            let original = std::env::var(key).ok();
            match value {
                Some(v) => std::env::set_var(key, v),
                None => std::env::remove_var(key),
            }
            Self { key, original }
        }
    }

    impl Drop for EnvVarGuard {
        fn drop(&mut self) {
            match self.original.as_deref() {
                Some(v) => std::env::set_var(self.key, v),
                None => std::env::remove_var(self.key),
            }
        }
    }

    #[test]
    fn test_config_from_env() {
        let _path = EnvVarGuard::set(ENV_LMDB_PATH, None);
        let _size = EnvVarGuard::set(ENV_LMDB_MAX_SIZE_MB, None);
        let _namespace = EnvVarGuard::set(ENV_LMDB_NAMESPACE, None);

        match LmdbStoreConfig::from_env() {
            Err(RecallError::Config(ConfigError::MissingRequired { field })) => {
                assert_eq!(field, ENV_LMDB_PATH);
            }
            other => panic!("expected MissingRequired, got {:?}", other),
        }

        let _path = EnvVarGuard::set(ENV_LMDB_PATH, Some("/tmp/recall-env"));
        let config = LmdbStoreConfig::from_env().expect("defaults should load");
        assert_eq!(config.path, PathBuf::from("/tmp/recall-env"));
        assert_eq!(config.max_size_mb, DEFAULT_MAX_SIZE_MB);
        assert_eq!(config.namespace, DEFAULT_NAMESPACE);

        let _size = EnvVarGuard::set(ENV_LMDB_MAX_SIZE_MB, Some(" 16 "));
        let _namespace = EnvVarGuard::set(ENV_LMDB_NAMESPACE, Some("jobs"));
        let config = LmdbStoreConfig::from_env().expect("overrides should load");
        assert_eq!(config.max_size_mb, 16);
        assert_eq!(config.namespace, "jobs");

        let _size = EnvVarGuard::set(ENV_LMDB_MAX_SIZE_MB, Some("lots"));
        match LmdbStoreConfig::from_env() {
            Err(RecallError::Config(ConfigError::InvalidValue { field, value, .. })) => {
                assert_eq!(field, ENV_LMDB_MAX_SIZE_MB);
                assert_eq!(value, "lots");
            }
            other => panic!("expected InvalidValue, got {:?}", other),
        }

        let huge = usize::MAX.to_string();
        let _size = EnvVarGuard::set(ENV_LMDB_MAX_SIZE_MB, Some(huge.as_str()));
        match LmdbStoreConfig::from_env() {
            Err(RecallError::Config(ConfigError::InvalidValue { field, .. })) => {
                assert_eq!(field, "max_size_mb");
            }
            other => panic!("expected InvalidValue, got {:?}", other),
        }
    }

    #[test]
    fn test_config_validation() {
        assert!(LmdbStoreConfig::new("/tmp/x").validate().is_ok());
        assert!(LmdbStoreConfig::new("").validate().is_err());
        assert!(LmdbStoreConfig::new("/tmp/x")
            .with_max_size_mb(0)
            .validate()
            .is_err());
        assert!(LmdbStoreConfig::new("/tmp/x")
            .with_namespace("")
            .validate()
            .is_err());
    }
}
