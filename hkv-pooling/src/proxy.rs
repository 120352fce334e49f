//! # Transparent Pooling Proxy
//!
//! Purpose: Implement a connection's capability interface on top of a pool so
//! application code never acquires or releases connections by hand.
//!
//! ## Design Principles
//! 1. **Proxy Pattern**: Interface adapters call `dispatch` with the method
//!    identity and a closure that forwards to the same method on a borrowed
//!    connection.
//! 2. **Single Loan**: At most one connection is held per proxy; it is cached
//!    with the instant it was last validated.
//! 3. **Minimal Locking**: The slot mutex covers the check-and-replace
//!    sequence only. Forwarded calls run after the lock is dropped.
//! 4. **Fail Fast**: Forwarded calls are never retried. A connection failure
//!    drops the cached connection so the next call borrows a fresh one.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::error::{ConnectionFailure, ProxyError};
use crate::policy::RecheckPolicy;
use crate::pool::{ComponentType, ConnectionPool};
use crate::stats::{ProxyStats, ProxyStatsSnapshot};

struct CachedConnection<C> {
    conn: Arc<C>,
    last_checked_at: Instant,
}

/// Long-lived handle that borrows validated connections from `P` per call.
pub struct TransparentPoolingProxy<P: ConnectionPool> {
    pool: P,
    component: ComponentType,
    policy: RecheckPolicy,
    slot: Mutex<Option<CachedConnection<P::Connection>>>,
    stats: ProxyStats,
}

impl<P: ConnectionPool> TransparentPoolingProxy<P> {
    /// Creates a proxy that re-checks its connection every 5 seconds.
    pub fn create(pool: P) -> Result<Self, ProxyError> {
        Self::with_policy(pool, RecheckPolicy::default())
    }

    /// Creates a proxy with a custom recheck interval. Zero rechecks on every
    /// call.
    pub fn with_recheck_interval(pool: P, interval: Duration) -> Result<Self, ProxyError> {
        Self::with_policy(pool, RecheckPolicy::new(interval))
    }

    /// Creates a proxy with an explicit policy.
    ///
    /// Fails with `ProxyError::Configuration` when the pool does not report a
    /// component type, or reports one without methods.
    pub fn with_policy(pool: P, policy: RecheckPolicy) -> Result<Self, ProxyError> {
        let component = pool.component_type().ok_or_else(|| {
            ProxyError::Configuration("pool does not report a component type".to_string())
        })?;
        if component.methods().is_empty() {
            return Err(ProxyError::Configuration(format!(
                "component type {} declares no methods",
                component
            )));
        }

        debug!(
            component = component.name(),
            recheck_ms = policy.interval().as_millis() as u64,
            "created pooling proxy"
        );

        Ok(TransparentPoolingProxy {
            pool,
            component,
            policy,
            slot: Mutex::new(None),
            stats: ProxyStats::new(),
        })
    }

    pub fn component_type(&self) -> ComponentType {
        self.component
    }

    pub fn policy(&self) -> RecheckPolicy {
        self.policy
    }

    pub fn pool(&self) -> &P {
        &self.pool
    }

    pub fn stats(&self) -> ProxyStatsSnapshot {
        self.stats.snapshot()
    }

    /// Returns true while a connection is held on loan.
    pub fn has_connection(&self) -> bool {
        self.lock_slot().is_some()
    }

    /// Forwards one intercepted call to a validated connection.
    ///
    /// `method` must be declared by the component type. The closure receives
    /// the connection and its result is returned verbatim. When the result is
    /// an error that reports a connection failure the cached connection is
    /// discarded before the error is returned.
    pub fn dispatch<R, E, F>(&self, method: &str, call: F) -> Result<R, E>
    where
        F: FnOnce(&P::Connection) -> Result<R, E>,
        E: From<ProxyError> + ConnectionFailure,
    {
        if !self.component.supports(method) {
            return Err(ProxyError::UnsupportedOperation {
                method: method.to_string(),
                component: self.component.name(),
            }
            .into());
        }

        self.stats.record_dispatch();
        let conn = self.current_connection()?;
        let result = call(&*conn);
        if let Err(err) = &result {
            if err.is_connection_failure() {
                self.invalidate(&conn, method);
            }
        }
        result
    }

    /// Drops the cached connection, returning it to the pool.
    ///
    /// The next dispatch borrows a fresh connection.
    pub fn reset(&self) {
        let cached = self.lock_slot().take();
        if let Some(cached) = cached {
            self.release_quietly(cached.conn);
        }
    }

    fn current_connection(&self) -> Result<Arc<P::Connection>, ProxyError> {
        let mut slot = self.lock_slot();
        let now = Instant::now();

        if let Some(cached) = slot.as_mut() {
            if !self.policy.is_due(cached.last_checked_at, now) {
                return Ok(Arc::clone(&cached.conn));
            }

            let healthy = self.pool.is_healthy(&cached.conn);
            self.stats.record_health_check(healthy);
            if healthy {
                cached.last_checked_at = now;
                return Ok(Arc::clone(&cached.conn));
            }
            debug!(component = self.component.name(), "cached connection failed health check");
        }

        if let Some(stale) = slot.take() {
            self.release_quietly(stale.conn);
        }

        let conn = self.pool.borrow().map_err(|err| {
            self.stats.record_borrow_failure();
            warn!(component = self.component.name(), error = %err, "failed to borrow connection");
            ProxyError::ConnectionUnavailable(err)
        })?;
        self.stats.record_borrow();
        debug!(component = self.component.name(), "borrowed connection");

        *slot = Some(CachedConnection {
            conn: Arc::clone(&conn),
            last_checked_at: Instant::now(),
        });
        Ok(conn)
    }

    fn invalidate(&self, failed: &Arc<P::Connection>, method: &str) {
        let cached = {
            let mut slot = self.lock_slot();
            // Another caller may already have replaced the failed connection.
            let is_current = slot
                .as_ref()
                .is_some_and(|cached| Arc::ptr_eq(&cached.conn, failed));
            if is_current {
                slot.take()
            } else {
                None
            }
        };

        if let Some(cached) = cached {
            self.stats.record_invalidation();
            debug!(
                component = self.component.name(),
                method,
                "connection failure, dropping cached connection"
            );
            self.release_quietly(cached.conn);
        }
    }

    fn release_quietly(&self, conn: Arc<P::Connection>) {
        let result = self.pool.release(conn);
        self.stats.record_release(result.is_ok());
        if let Err(err) = result {
            warn!(
                component = self.component.name(),
                error = %err,
                "failed to return connection to pool"
            );
        }
    }

    fn lock_slot(&self) -> MutexGuard<'_, Option<CachedConnection<P::Connection>>> {
        // The slot holds no invariant a panicking pool call could break.
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<P: ConnectionPool> Drop for TransparentPoolingProxy<P> {
    fn drop(&mut self) {
        let cached = self
            .slot
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(cached) = cached {
            self.release_quietly(cached.conn);
        }
    }
}

impl<P: ConnectionPool> fmt::Debug for TransparentPoolingProxy<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransparentPoolingProxy")
            .field("component", &self.component.name())
            .field("policy", &self.policy)
            .field("stats", &self.stats.snapshot())
            .finish()
    }
}
