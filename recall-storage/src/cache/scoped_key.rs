//! Namespace-scoped keys for the LMDB store.
//!
//! Several stores may share one LMDB environment. Every key a store writes
//! is prefixed with that store's namespace, so `clear()` on one store can
//! never touch another store's entries.

use sha2::{Digest, Sha256};

/// Separator between the namespace and a plain key.
const SEPARATOR: u8 = 0xFF;

/// Separator between the namespace and a hashed key.
///
/// Distinct from [`SEPARATOR`] so a digest can never collide with a plain key
/// that happens to be 64 hex characters.
const HASHED_SEPARATOR: u8 = 0xFE;

/// LMDB's default maximum key size in bytes.
pub const MAX_KEY_BYTES: usize = 511;

/// Hex length of a SHA-256 digest.
const DIGEST_HEX_LEN: usize = 64;

/// Longest namespace whose hashed keys still fit in [`MAX_KEY_BYTES`].
pub const MAX_NAMESPACE_BYTES: usize = MAX_KEY_BYTES - 1 - DIGEST_HEX_LEN;

/// A store key bound to a namespace.
///
/// # Binary Format
///
/// - `namespace bytes | 0xFF | key bytes` when that fits in
///   [`MAX_KEY_BYTES`]
/// - `namespace bytes | 0xFE | sha256(key) as 64 hex chars` otherwise
///
/// Neither `0xFF` nor `0xFE` can occur in UTF-8, so the namespace boundary is
/// unambiguous. Every key fits in [`MAX_KEY_BYTES`] as long as the namespace
/// is at most [`MAX_NAMESPACE_BYTES`] long.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScopedKey {
    encoded: Vec<u8>,
    hashed: bool,
}

impl ScopedKey {
    /// Scope `key` under `namespace`.
    pub fn new(namespace: &str, key: &str) -> Self {
        let plain_len = namespace.len() + 1 + key.len();
        if plain_len <= MAX_KEY_BYTES {
            let mut encoded = Vec::with_capacity(plain_len);
            encoded.extend_from_slice(namespace.as_bytes());
            encoded.push(SEPARATOR);
            encoded.extend_from_slice(key.as_bytes());
            return Self {
                encoded,
                hashed: false,
            };
        }

        let digest = hex::encode(Sha256::digest(key.as_bytes()));
        let mut encoded = Vec::with_capacity(namespace.len() + 1 + digest.len());
        encoded.extend_from_slice(namespace.as_bytes());
        encoded.push(HASHED_SEPARATOR);
        encoded.extend_from_slice(digest.as_bytes());
        Self {
            encoded,
            hashed: true,
        }
    }

    /// Bytes written to LMDB.
    pub fn as_bytes(&self) -> &[u8] {
        &self.encoded
    }

    /// Whether the key was replaced by its digest.
    pub fn is_hashed(&self) -> bool {
        self.hashed
    }

    /// Whether `encoded` belongs to `namespace`, in plain or hashed form.
    pub fn in_namespace(encoded: &[u8], namespace: &str) -> bool {
        let ns = namespace.as_bytes();
        encoded.len() > ns.len()
            && &encoded[..ns.len()] == ns
            && matches!(encoded[ns.len()], SEPARATOR | HASHED_SEPARATOR)
    }

    /// Prefix shared by every plain key in `namespace`.
    pub fn namespace_prefix(namespace: &str) -> Vec<u8> {
        let mut prefix = Vec::with_capacity(namespace.len() + 1);
        prefix.extend_from_slice(namespace.as_bytes());
        prefix.push(SEPARATOR);
        prefix
    }
}

impl AsRef<[u8]> for ScopedKey {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}
