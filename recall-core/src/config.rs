//! Proxy configuration loaded from the environment.

use std::time::Duration;

use crate::{ConfigError, RecallResult};

/// Environment variable holding the default TTL in milliseconds.
pub const ENV_DEFAULT_TTL_MS: &str = "RECALL_DEFAULT_TTL_MS";

/// Environment variable holding the root key prefix.
pub const ENV_KEY_PREFIX: &str = "RECALL_KEY_PREFIX";

/// Defaults applied to every proxy built from this configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProxyConfig {
    /// TTL for stored entries when no hook overrides it. `None` means entries
    /// do not expire at this layer's request.
    pub default_ttl: Option<Duration>,
    /// Prefix prepended to every derived key of the root proxy.
    pub prefix: String,
}

impl ProxyConfig {
    /// Create a configuration with no TTL and an empty prefix.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default TTL.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = Some(ttl);
        self
    }

    /// Set the key prefix.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Load configuration from environment variables, ignoring bad values.
    ///
    /// Environment variables:
    /// - `RECALL_DEFAULT_TTL_MS`: default TTL in milliseconds (unset, empty or 0 = no expiry)
    /// - `RECALL_KEY_PREFIX`: root key prefix (default: empty)
    pub fn from_env() -> Self {
        Self::try_from_env().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Invalid recall configuration, using defaults");
            Self::default()
        })
    }

    /// Load configuration from environment variables, rejecting bad values.
    pub fn try_from_env() -> RecallResult<Self> {
        let default_ttl = match std::env::var(ENV_DEFAULT_TTL_MS) {
            Ok(raw) => parse_ttl_ms(ENV_DEFAULT_TTL_MS, &raw)?,
            Err(_) => None,
        };
        let prefix = std::env::var(ENV_KEY_PREFIX).unwrap_or_default();

        let config = Self {
            default_ttl,
            prefix,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// Validates:
    /// - default_ttl, when set, is non-zero
    /// - prefix contains no control characters
    pub fn validate(&self) -> RecallResult<()> {
        if let Some(ttl) = self.default_ttl {
            if ttl.is_zero() {
                return Err(ConfigError::InvalidValue {
                    field: "default_ttl".to_string(),
                    value: format!("{:?}", ttl),
                    reason: "default_ttl must be positive; use None for no expiry".to_string(),
                }
                .into());
            }
        }

        if self.prefix.chars().any(char::is_control) {
            return Err(ConfigError::InvalidValue {
                field: "prefix".to_string(),
                value: self.prefix.escape_debug().to_string(),
                reason: "prefix must not contain control characters".to_string(),
            }
            .into());
        }

        Ok(())
    }
}

/// Parse a millisecond TTL. Empty and `0` mean no TTL.
pub fn parse_ttl_ms(field: &str, raw: &str) -> RecallResult<Option<Duration>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let millis: u64 = trimmed.parse().map_err(|_| ConfigError::InvalidValue {
        field: field.to_string(),
        value: raw.to_string(),
        reason: "must be a non-negative integer number of milliseconds".to_string(),
    })?;
    Ok(if millis == 0 {
        None
    } else {
        Some(Duration::from_millis(millis))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RecallError;

    #[test]
    fn test_default_config() {
        let config = ProxyConfig::default();
        assert_eq!(config.default_ttl, None);
        assert_eq!(config.prefix, "");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = ProxyConfig::new()
            .with_ttl(Duration::from_millis(100))
            .with_prefix("app:");
        assert_eq!(config.default_ttl, Some(Duration::from_millis(100)));
        assert_eq!(config.prefix, "app:");
    }

    #[test]
    fn test_validate_rejects_zero_ttl() {
        let config = ProxyConfig {
            default_ttl: Some(Duration::ZERO),
            prefix: String::new(),
        };
        match config.validate() {
            Err(RecallError::Config(ConfigError::InvalidValue { field, .. })) => {
                assert_eq!(field, "default_ttl");
            }
            other => panic!("Expected ConfigError::InvalidValue, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_rejects_control_chars_in_prefix() {
        let config = ProxyConfig::new().with_prefix("app\n");
        assert!(matches!(
            config.validate(),
            Err(RecallError::Config(ConfigError::InvalidValue { .. }))
        ));
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
    fn test_proxy_config_from_env() {
        let _ttl = EnvVarGuard::set(ENV_DEFAULT_TTL_MS, None);
        let _prefix = EnvVarGuard::set(ENV_KEY_PREFIX, None);
        assert_eq!(ProxyConfig::try_from_env().unwrap(), ProxyConfig::default());

        for no_ttl in ["", "0", "  "] {
            let _ttl = EnvVarGuard::set(ENV_DEFAULT_TTL_MS, Some(no_ttl));
            assert_eq!(ProxyConfig::try_from_env().unwrap().default_ttl, None);
        }

        let _ttl = EnvVarGuard::set(ENV_DEFAULT_TTL_MS, Some("1500"));
        let _prefix = EnvVarGuard::set(ENV_KEY_PREFIX, Some("svc:"));
        let config = ProxyConfig::try_from_env().unwrap();
        assert_eq!(config.default_ttl, Some(Duration::from_millis(1500)));
        assert_eq!(config.prefix, "svc:");
        assert_eq!(ProxyConfig::from_env(), config);

        let _ttl = EnvVarGuard::set(ENV_DEFAULT_TTL_MS, Some("soon"));
        match ProxyConfig::try_from_env() {
            Err(RecallError::Config(ConfigError::InvalidValue { field, value, .. })) => {
                assert_eq!(field, ENV_DEFAULT_TTL_MS);
                assert_eq!(value, "soon");
            }
            other => panic!("Expected ConfigError::InvalidValue, got {:?}", other),
        }
        // The lenient loader drops the whole environment, prefix included.
        assert_eq!(ProxyConfig::from_env(), ProxyConfig::default());

        let _ttl = EnvVarGuard::set(ENV_DEFAULT_TTL_MS, None);
        let _prefix = EnvVarGuard::set(ENV_KEY_PREFIX, Some("bad\tprefix"));
        assert!(ProxyConfig::try_from_env().is_err());
        assert_eq!(ProxyConfig::from_env(), ProxyConfig::default());
    }

    #[test]
    fn test_parse_ttl_ms() {
        assert_eq!(parse_ttl_ms("f", "").unwrap(), None);
        assert_eq!(parse_ttl_ms("f", " 0 ").unwrap(), None);
        assert_eq!(
            parse_ttl_ms("f", "250").unwrap(),
            Some(Duration::from_millis(250))
        );
        assert!(parse_ttl_ms("f", "-5").is_err());
        assert!(parse_ttl_ms("f", "soon").is_err());
    }
}
