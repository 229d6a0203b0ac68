//! Tracing subscriber initialization.

use recall_core::{ConfigError, RecallResult};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Environment variable holding the `EnvFilter` directive.
pub const ENV_LOG: &str = "RECALL_LOG";

/// Environment variable selecting `json` or `pretty` output.
pub const ENV_LOG_FORMAT: &str = "RECALL_LOG_FORMAT";

const DEFAULT_FILTER: &str = "recall=info";

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    /// `EnvFilter` directive, e.g. `"recall_proxy=debug,info"`.
    pub filter: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_FILTER.to_string(),
            json: true,
        }
    }
}

impl TelemetryConfig {
    /// Load from `RECALL_LOG` and `RECALL_LOG_FORMAT`.
    pub fn from_env() -> RecallResult<Self> {
        let filter = std::env::var(ENV_LOG).unwrap_or_else(|_| DEFAULT_FILTER.to_string());
        let json = match std::env::var(ENV_LOG_FORMAT) {
            Ok(format) => match format.trim().to_ascii_lowercase().as_str() {
                "json" => true,
                "pretty" => false,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        field: ENV_LOG_FORMAT.to_string(),
                        value: format,
                        reason: "expected 'json' or 'pretty'".to_string(),
                    }
                    .into())
                }
            },
            Err(_) => true,
        };

        let config = Self { filter, json };
        config.validate()?;
        Ok(config)
    }

    /// Check that `filter` parses as an `EnvFilter` directive.
    pub fn validate(&self) -> RecallResult<()> {
        self.env_filter().map(|_| ())
    }

    fn env_filter(&self) -> RecallResult<EnvFilter> {
        EnvFilter::try_new(&self.filter).map_err(|e| {
            ConfigError::InvalidValue {
                field: "filter".to_string(),
                value: self.filter.clone(),
                reason: e.to_string(),
            }
            .into()
        })
    }
}

/// Install the global tracing subscriber.
///
/// Call once at startup. A second call returns an error instead of
/// replacing the subscriber.
pub fn init_tracing(config: &TelemetryConfig) -> RecallResult<()> {
    let env_filter = config.env_filter()?;
    let registry = tracing_subscriber::registry().with(env_filter);

    let installed = if config.json {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().pretty())
            .try_init()
    };

    installed.map_err(|e| ConfigError::InvalidValue {
        field: "subscriber".to_string(),
        value: "global".to_string(),
        reason: format!("Failed to init subscriber: {}", e),
    })?;

    tracing::info!(filter = %config.filter, json = config.json, "Tracing initialized");
    Ok(())
}
