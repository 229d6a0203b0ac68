//! Proxy construction.

use recall_core::CacheTarget;
use std::sync::Arc;

use crate::options::ProxyOptions;
use crate::proxy::CachedProxy;

/// Wraps any number of targets with the same options.
#[derive(Debug, Clone)]
pub struct ProxyFactory {
    options: ProxyOptions,
}

impl ProxyFactory {
    pub fn new(options: ProxyOptions) -> Self {
        Self { options }
    }

    /// Wrap `target`. Method results are cached under the configured prefix.
    pub fn wrap(&self, target: Arc<dyn CacheTarget>) -> CachedProxy {
        tracing::debug!(
            prefix = self.options.prefix(),
            store = self.options.store().name(),
            "Wrapping target"
        );
        CachedProxy::new(target, self.options.clone())
    }

    pub fn options(&self) -> &ProxyOptions {
        &self.options
    }
}

/// Shorthand for [`ProxyFactory::new`].
///
/// ```ignore
/// let wrap = cache_proxy(ProxyOptions::new(store).with_ttl(Duration::from_secs(30)));
/// let api = wrap.wrap(api_target);
/// let users = wrap.wrap(user_target);
/// ```
pub fn cache_proxy(options: ProxyOptions) -> ProxyFactory {
    ProxyFactory::new(options)
}
