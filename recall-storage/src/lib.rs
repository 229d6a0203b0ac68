//! recall storage - cache store capability and reference stores
//!
//! The proxy layer talks to storage only through [`CacheStore`]. This crate
//! defines that trait and ships an in-memory and an LMDB implementation.

pub mod cache;

pub use cache::{
    CacheStats, CacheStore, Expiry, LmdbStore, LmdbStoreConfig, LmdbStoreError, MemoryStore,
    ScopedKey, ENV_LMDB_MAX_SIZE_MB, ENV_LMDB_NAMESPACE, ENV_LMDB_PATH, MAX_KEY_BYTES,
    MAX_NAMESPACE_BYTES,
};
