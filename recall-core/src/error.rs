//! Error types for recall operations

use thiserror::Error;

/// Cache store errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Store {backend} unavailable: {reason}")]
    Unavailable { backend: String, reason: String },

    #[error("Failed to serialize value for key {key}: {reason}")]
    Serialization { key: String, reason: String },

    #[error("Failed to deserialize value for key {key}: {reason}")]
    Deserialization { key: String, reason: String },

    #[error("Transaction failed: {reason}")]
    Transaction { reason: String },

    #[error("Store lock poisoned")]
    LockPoisoned,
}

/// Errors raised by a wrapped target's own methods.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TargetError {
    #[error("Method {method} failed: {reason}")]
    MethodFailed { method: String, reason: String },

    #[error("Invalid arguments for {method}: {reason}")]
    InvalidArguments { method: String, reason: String },
}

/// Errors raised by `on_cached` / `on_fetched` hooks.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HookError {
    #[error("Hook {hook} rejected key {key}: {reason}")]
    Rejected {
        hook: String,
        key: String,
        reason: String,
    },
}

/// Errors from navigating a proxied member graph.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProxyError {
    #[error("Unknown member: {path}")]
    UnknownMember { path: String },

    #[error("Member is not callable: {path}")]
    NotCallable { path: String },

    #[error("Member is not an object: {path}")]
    NotAnObject { path: String },

    #[error("Member is not a plain value: {path}")]
    NotAValue { path: String },

    #[error("Result of {path} could not be decoded: {reason}")]
    ResultDecode { path: String, reason: String },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Instance registry errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Instance {name} is registered with a different type than {expected}")]
    TypeMismatch { name: String, expected: String },

    #[error("Initialization of {name} failed: {reason}")]
    InitFailed { name: String, reason: String },
}

/// Master error type for all recall errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RecallError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Target error: {0}")]
    Target(#[from] TargetError),

    #[error("Hook error: {0}")]
    Hook(#[from] HookError),

    #[error("Proxy error: {0}")]
    Proxy(#[from] ProxyError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),
}

impl RecallError {
    /// Shorthand for a failed target method.
    pub fn method_failed(method: impl Into<String>, reason: impl Into<String>) -> Self {
        RecallError::Target(TargetError::MethodFailed {
            method: method.into(),
            reason: reason.into(),
        })
    }

    /// Shorthand for a hook rejection.
    pub fn hook_rejected(
        hook: impl Into<String>,
        key: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        RecallError::Hook(HookError::Rejected {
            hook: hook.into(),
            key: key.into(),
            reason: reason.into(),
        })
    }
}

/// Result type alias for recall operations.
pub type RecallResult<T> = Result<T, RecallError>;

// =============================================================================
// TESTS
// =============================================================================
