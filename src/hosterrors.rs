//! Per-host failure tracking.
//!
//! Checks that fail with an error mark their target here. Once a host has
//! failed `max_errors` times it is reported as failed, which executers use
//! to skip further requests to an unresponsive host.

use dashmap::DashMap;

use crate::types::TargetId;

/// Default number of errors after which a host is considered failed.
pub const DEFAULT_MAX_HOST_ERRORS: u32 = 30;

/// Failure cache consulted by the scheduler when a check errors.
pub trait FailureCache: Send + Sync + std::fmt::Debug {
    fn mark_failed(&self, target: &TargetId, err: &anyhow::Error);

    fn is_failed(&self, target: &TargetId) -> bool;
}

/// In-memory error counter keyed by normalised host.
#[derive(Debug)]
pub struct HostErrorsCache {
    max_errors: u32,
    failed: DashMap<String, u32>,
}

impl Default for HostErrorsCache {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_HOST_ERRORS)
    }
}

impl HostErrorsCache {
    pub fn new(max_errors: u32) -> Self {
        Self {
            max_errors: max_errors.max(1),
            failed: DashMap::new(),
        }
    }

    pub fn max_errors(&self) -> u32 {
        self.max_errors
    }

    /// Errors recorded so far for the host of `target`.
    pub fn error_count(&self, target: &TargetId) -> u32 {
        self.failed
            .get(&target.host())
            .map(|count| *count)
            .unwrap_or(0)
    }
}

impl FailureCache for HostErrorsCache {
    fn mark_failed(&self, target: &TargetId, err: &anyhow::Error) {
        let host = target.host();
        let count = {
            let mut entry = self.failed.entry(host.clone()).or_insert(0);
            *entry += 1;
            *entry
        };

        tracing::debug!("Host {} errored ({}/{}): {}", host, count, self.max_errors, err);
        if count == self.max_errors {
            tracing::info!(
                "Skipping {} as previously unresponsive {} times",
                host,
                count
            );
        }
    }

    fn is_failed(&self, target: &TargetId) -> bool {
        self.error_count(target) >= self.max_errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_fails_after_threshold() {
        let cache = HostErrorsCache::new(2);
        let target = TargetId::new("https://example.com/login");
        let err = anyhow::anyhow!("connection reset");

        cache.mark_failed(&target, &err);
        assert!(!cache.is_failed(&target));

        cache.mark_failed(&TargetId::new("http://EXAMPLE.com/other"), &err);
        assert!(cache.is_failed(&target));
        assert_eq!(cache.error_count(&target), 2);
    }

    #[test]
    fn unknown_host_is_not_failed() {
        let cache = HostErrorsCache::default();
        assert_eq!(cache.max_errors(), DEFAULT_MAX_HOST_ERRORS);
        assert!(!cache.is_failed(&TargetId::new("nowhere.test")));
    }
}
