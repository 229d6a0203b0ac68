//! Cache key derivation.
//!
//! A `CacheKey` can only be produced by [`CacheKey::derive`], so every key
//! stored by a proxy has the shape
//!
//! ```text
//! <prefix><method>(<json arg 1>,<json arg 2>,...)
//! ```
//!
//! Arguments are encoded as compact JSON text. Object keys keep their
//! insertion order, so `{"a":1,"b":2}` and `{"b":2,"a":1}` derive different
//! keys. Callers that need order-insensitive keys must normalise arguments
//! before calling.

use serde_json::Value;
use std::fmt;

/// Separator appended after a property name when descending into a nested object.
pub const PATH_SEPARATOR: char = '.';

/// A derived cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    inner: String,
}

impl CacheKey {
    /// Derive the key for calling `method` under `prefix` with `args`.
    ///
    /// Pure and deterministic: equal inputs (by JSON text) always produce
    /// equal keys.
    pub fn derive(prefix: &str, method: &str, args: &[Value]) -> Self {
        let mut inner = String::with_capacity(prefix.len() + method.len() + 2 + args.len() * 8);
        inner.push_str(prefix);
        inner.push_str(method);
        inner.push('(');
        for (i, arg) in args.iter().enumerate() {
            if i > 0 {
                inner.push(',');
            }
            inner.push_str(&encode_arg(arg));
        }
        inner.push(')');
        Self { inner }
    }

    /// The key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.inner
    }

    /// Consume the key and return the owned string.
    pub fn into_string(self) -> String {
        self.inner
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.inner)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.inner
    }
}

/// Extend a key prefix with a nested property name.
///
/// `child_prefix("app:", "api")` is `"app:api."`.
pub fn child_prefix(prefix: &str, property: &str) -> String {
    let mut next = String::with_capacity(prefix.len() + property.len() + 1);
    next.push_str(prefix);
    next.push_str(property);
    next.push(PATH_SEPARATOR);
    next
}

/// Compact JSON encoding of a single argument.
fn encode_arg(arg: &Value) -> String {
    // Display for Value is the compact serializer and cannot fail.
    arg.to_string()
}
