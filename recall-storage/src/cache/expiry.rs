//! Entry expiry.
//!
//! Stores translate a caller's TTL into an absolute [`Expiry`] at write time
//! and compare it against the clock at read time.

use chrono::{DateTime, Utc};
use std::time::Duration;

/// Marker persisted for entries that never expire.
const NEVER_MILLIS: i64 = i64::MAX;

/// When a stored entry stops being served.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Expiry {
    /// The entry is served until overwritten or deleted.
    #[default]
    Never,
    /// The entry is absent at and after this instant.
    At(DateTime<Utc>),
}

impl Expiry {
    /// Expiry for a TTL measured from `now`. `None` and zero mean never.
    pub fn from_ttl(ttl: Option<Duration>, now: DateTime<Utc>) -> Self {
        match ttl {
            Some(ttl) if !ttl.is_zero() => match chrono::Duration::from_std(ttl) {
                Ok(delta) => now
                    .checked_add_signed(delta)
                    .map(Expiry::At)
                    .unwrap_or(Expiry::Never),
                // Longer than chrono can represent: effectively forever.
                Err(_) => Expiry::Never,
            },
            _ => Expiry::Never,
        }
    }

    /// Whether the entry is expired as of `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self {
            Expiry::Never => false,
            Expiry::At(at) => now >= *at,
        }
    }

    /// Time left before expiry, `None` for entries that never expire.
    pub fn remaining(&self, now: DateTime<Utc>) -> Option<Duration> {
        match self {
            Expiry::Never => None,
            Expiry::At(at) => Some((*at - now).to_std().unwrap_or(Duration::ZERO)),
        }
    }

    /// Encode as unix milliseconds for persistent stores.
    pub fn to_millis(&self) -> i64 {
        match self {
            Expiry::Never => NEVER_MILLIS,
            Expiry::At(at) => at.timestamp_millis(),
        }
    }

    /// Decode from unix milliseconds.
    pub fn from_millis(millis: i64) -> Self {
        if millis == NEVER_MILLIS {
            return Expiry::Never;
        }
        DateTime::from_timestamp_millis(millis)
            .map(Expiry::At)
            .unwrap_or(Expiry::Never)
    }
}
