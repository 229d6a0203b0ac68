//! Cache stores with per-entry expiry.
//!
//! Everything a memoizing proxy needs from storage is the [`CacheStore`]
//! capability. Two implementations ship here:
//!
//! - [`MemoryStore`]: in-process, lost on restart
//! - [`LmdbStore`]: persistent, namespaced via [`ScopedKey`]
//!
//! # Absent vs null
//!
//! A stored JSON `null` is a hit. Only a missing or expired entry reads as
//! `None`.
//!
//! # Example
//!
//! ```ignore
//! let store = MemoryStore::new();
//! store.set("app:add(1,2)", json!(3), Some(Duration::from_secs(60))).await?;
//! assert_eq!(store.get("app:add(1,2)").await?, Some(json!(3)));
//! ```

pub mod expiry;
pub mod lmdb_backend;
pub mod memory;
pub mod scoped_key;
pub mod traits;

pub use expiry::Expiry;
pub use lmdb_backend::{
    LmdbStore, LmdbStoreConfig, LmdbStoreError, ENV_LMDB_MAX_SIZE_MB, ENV_LMDB_NAMESPACE,
    ENV_LMDB_PATH,
};
pub use memory::MemoryStore;
pub use scoped_key::{ScopedKey, MAX_KEY_BYTES, MAX_NAMESPACE_BYTES};
pub use traits::{CacheStats, CacheStore};
