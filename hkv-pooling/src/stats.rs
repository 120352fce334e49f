//! # Proxy Counters
//!
//! Atomic counters describing how a proxy interacts with its pool.
//! `Ordering::Relaxed` is enough: fields are read independently and only
//! need to be eventually consistent.

use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time copy of the proxy counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProxyStatsSnapshot {
    /// Calls accepted for forwarding.
    pub dispatches: u64,
    /// Connections borrowed from the pool.
    pub borrows: u64,
    /// Failed borrow attempts.
    pub borrow_failures: u64,
    /// Connections handed back to the pool.
    pub releases: u64,
    /// Releases the pool refused.
    pub release_failures: u64,
    /// Health checks performed on the cached connection.
    pub health_checks: u64,
    /// Health checks that reported the connection unusable.
    pub health_failures: u64,
    /// Cached connections dropped after a connection-level failure.
    pub invalidations: u64,
}

#[derive(Debug, Default)]
pub struct ProxyStats {
    dispatches: AtomicU64,
    borrows: AtomicU64,
    borrow_failures: AtomicU64,
    releases: AtomicU64,
    release_failures: AtomicU64,
    health_checks: AtomicU64,
    health_failures: AtomicU64,
    invalidations: AtomicU64,
}

impl ProxyStats {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub(crate) fn record_dispatch(&self) {
        self.dispatches.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_borrow(&self) {
        self.borrows.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_borrow_failure(&self) {
        self.borrow_failures.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_release(&self, ok: bool) {
        self.releases.fetch_add(1, Ordering::Relaxed);
        if !ok {
            self.release_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[inline]
    pub(crate) fn record_health_check(&self, healthy: bool) {
        self.health_checks.fetch_add(1, Ordering::Relaxed);
        if !healthy {
            self.health_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[inline]
    pub(crate) fn record_invalidation(&self) {
        self.invalidations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ProxyStatsSnapshot {
        ProxyStatsSnapshot {
            dispatches: self.dispatches.load(Ordering::Relaxed),
            borrows: self.borrows.load(Ordering::Relaxed),
            borrow_failures: self.borrow_failures.load(Ordering::Relaxed),
            releases: self.releases.load(Ordering::Relaxed),
            release_failures: self.release_failures.load(Ordering::Relaxed),
            health_checks: self.health_checks.load(Ordering::Relaxed),
            health_failures: self.health_failures.load(Ordering::Relaxed),
            invalidations: self.invalidations.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reflects_records() {
        let stats = ProxyStats::new();
        stats.record_dispatch();
        stats.record_dispatch();
        stats.record_borrow();
        stats.record_release(true);
        stats.record_release(false);
        stats.record_health_check(true);
        stats.record_health_check(false);
        stats.record_invalidation();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.dispatches, 2);
        assert_eq!(snapshot.borrows, 1);
        assert_eq!(snapshot.borrow_failures, 0);
        assert_eq!(snapshot.releases, 2);
        assert_eq!(snapshot.release_failures, 1);
        assert_eq!(snapshot.health_checks, 2);
        assert_eq!(snapshot.health_failures, 1);
        assert_eq!(snapshot.invalidations, 1);
    }
}
