//! Per-registry health tracking
//!
//! One [`RegistryHealth`] instance exists per configured registry per
//! session. It carries two independent one-way flags: whether the richer
//! dependency-info query is supported, and whether the registry is reachable
//! at all. Both start optimistic and, once tripped, stay tripped for the
//! rest of the session; only a new session resets them.
//!
//! The accessibility flag doubles as a log limiter: the first access error
//! from a registry is logged with its full error chain, all later ones are
//! swallowed to avoid flooding the log during a large graph walk.

use crate::Error;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug)]
pub struct RegistryHealth {
    registry_name: String,
    dependency_info_supported: AtomicBool,
    accessible: AtomicBool,
}

impl RegistryHealth {
    pub fn new(registry_name: impl Into<String>) -> Self {
        Self {
            registry_name: registry_name.into(),
            dependency_info_supported: AtomicBool::new(true),
            accessible: AtomicBool::new(true),
        }
    }

    pub fn registry_name(&self) -> &str {
        &self.registry_name
    }

    /// Whether the richer dependency-info query is still worth attempting.
    pub fn dependency_info_supported(&self) -> bool {
        self.dependency_info_supported.load(Ordering::Relaxed)
    }

    /// Pin the dependency-info flag false for the rest of the session.
    /// Cheap negative caching: the query is never retried this session.
    pub fn mark_dependency_info_unsupported(&self) {
        if self.dependency_info_supported.swap(false, Ordering::Relaxed) {
            tracing::debug!(
                registry = %self.registry_name,
                "registry does not support dependency-info queries, \
                 falling back to plain version queries for this session"
            );
        }
    }

    pub fn is_accessible(&self) -> bool {
        self.accessible.load(Ordering::Relaxed)
    }

    /// Record an access failure against this registry.
    ///
    /// The first failure trips the breaker and logs the error chain; every
    /// later failure this session is silently swallowed. Cancellation is not
    /// an access failure and must not be recorded here.
    pub fn record_access_error(&self, error: &Error) {
        debug_assert!(!error.is_cancelled());

        if self.accessible.swap(false, Ordering::Relaxed) {
            tracing::warn!(
                registry = %self.registry_name,
                error = %format_chain(error),
                "registry is unreachable, ignoring it for the rest of this session"
            );
        }
    }
}

fn format_chain(error: &Error) -> String {
    let mut rendered = error.to_string();
    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        rendered.push_str(": ");
        rendered.push_str(&cause.to_string());
        source = cause.source();
    }
    rendered
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_start_optimistic() {
        let health = RegistryHealth::new("primary");
        assert!(health.dependency_info_supported());
        assert!(health.is_accessible());
    }

    #[test]
    fn test_dependency_info_flag_is_one_way() {
        let health = RegistryHealth::new("primary");
        health.mark_dependency_info_unsupported();
        assert!(!health.dependency_info_supported());
        // Re-marking stays false and must not panic.
        health.mark_dependency_info_unsupported();
        assert!(!health.dependency_info_supported());
    }

    #[test]
    fn test_access_breaker_trips_once() {
        let health = RegistryHealth::new("primary");
        let err = Error::Other("connection refused".to_string());

        health.record_access_error(&err);
        assert!(!health.is_accessible());
        health.record_access_error(&err);
        assert!(!health.is_accessible());
    }

    #[test]
    fn test_breaker_does_not_affect_dependency_info_flag() {
        let health = RegistryHealth::new("primary");
        health.record_access_error(&Error::Other("boom".to_string()));
        assert!(health.dependency_info_supported());
    }

    #[test]
    fn test_format_chain_includes_sources() {
        let inner = Error::Other("socket closed".to_string());
        let outer = Error::RegistryAccess {
            registry: "primary".to_string(),
            source: Box::new(inner),
        };
        let chain = format_chain(&outer);
        assert!(chain.contains("not reachable"));
        assert!(chain.contains("socket closed"));
    }
}
