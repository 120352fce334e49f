//! # Connection Pool
//!
//! Purpose: Reuse TCP connections to reduce handshake latency and hand them
//! out on loan through the `ConnectionPool` contract.
//!
//! ## Design Principles
//! 1. **Object Pool Pattern**: Keep a bounded set of reusable connections.
//! 2. **Minimal Locking**: Hold the mutex only while moving idle connections.
//! 3. **Fail Fast**: Exceeding the pool limit returns an error immediately.
//! 4. **Discard Broken**: Connections that saw an IO or framing failure are
//!    never handed out again.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use hkv_pooling::{ComponentType, ConnectionPool, PoolError};
use tracing::{debug, trace};

use crate::commands::KV_COMMANDS;
use crate::connection::Connection;
use crate::error::{ClientError, ClientResult};

static NEXT_POOL_ID: AtomicU64 = AtomicU64::new(1);

/// Pool configuration.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Server address, e.g. "127.0.0.1:6379".
    pub addr: String,
    /// Maximum number of idle connections to keep.
    pub max_idle: usize,
    /// Maximum total connections (idle + in-use).
    pub max_total: usize,
    /// Optional TCP read timeout.
    pub read_timeout: Option<Duration>,
    /// Optional TCP write timeout.
    pub write_timeout: Option<Duration>,
    /// Optional TCP connect timeout.
    pub connect_timeout: Option<Duration>,
}

/// Occupancy of a pool at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStatus {
    pub idle: usize,
    pub total: usize,
    pub max_total: usize,
}

struct PoolState {
    idle: VecDeque<Arc<Connection>>,
    total: usize,
    next_conn_id: u64,
}

struct PoolInner {
    id: u64,
    addr: SocketAddr,
    config: PoolConfig,
    state: Mutex<PoolState>,
}

/// Bounded TCP connection pool.
#[derive(Clone)]
pub struct TcpPool {
    inner: Arc<PoolInner>,
}

impl TcpPool {
    /// Creates a new connection pool with the provided configuration.
    ///
    /// No connection is opened until the first borrow.
    pub fn new(config: PoolConfig) -> ClientResult<Self> {
        let addr: SocketAddr = config.addr.parse().map_err(|_| ClientError::InvalidAddress)?;
        let state = PoolState {
            idle: VecDeque::with_capacity(config.max_idle),
            total: 0,
            next_conn_id: 1,
        };
        Ok(TcpPool {
            inner: Arc::new(PoolInner {
                id: NEXT_POOL_ID.fetch_add(1, Ordering::Relaxed),
                addr,
                config,
                state: Mutex::new(state),
            }),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.inner.addr
    }

    pub fn status(&self) -> PoolStatus {
        let state = self.inner.state.lock().expect("pool mutex poisoned");
        PoolStatus {
            idle: state.idle.len(),
            total: state.total,
            max_total: self.inner.config.max_total,
        }
    }

    fn pop_idle(&self) -> Option<Arc<Connection>> {
        let mut state = self.inner.state.lock().expect("pool mutex poisoned");
        while let Some(conn) = state.idle.pop_front() {
            if !conn.is_broken() {
                return Some(conn);
            }
            state.total = state.total.saturating_sub(1);
            trace!(conn = conn.id(), "discarded broken idle connection");
        }
        None
    }

    /// Reserves a slot and returns the id for the new connection.
    fn try_reserve(&self) -> Option<u64> {
        let mut state = self.inner.state.lock().expect("pool mutex poisoned");
        if state.total >= self.inner.config.max_total {
            return None;
        }
        state.total += 1;
        let id = state.next_conn_id;
        state.next_conn_id += 1;
        Some(id)
    }

    fn release_slot(&self) {
        let mut state = self.inner.state.lock().expect("pool mutex poisoned");
        state.total = state.total.saturating_sub(1);
    }
}

impl ConnectionPool for TcpPool {
    type Connection = Connection;

    fn component_type(&self) -> Option<ComponentType> {
        Some(KV_COMMANDS)
    }

    fn borrow(&self) -> Result<Arc<Connection>, PoolError> {
        if let Some(conn) = self.pop_idle() {
            return Ok(conn);
        }

        let id = self.try_reserve().ok_or(PoolError::Exhausted)?;
        match Connection::connect(&self.inner.config, self.inner.addr, self.inner.id, id) {
            Ok(conn) => {
                debug!(conn = id, addr = %self.inner.addr, "opened connection");
                Ok(Arc::new(conn))
            }
            Err(err) => {
                self.release_slot();
                Err(PoolError::Connection(Box::new(err)))
            }
        }
    }

    fn release(&self, conn: Arc<Connection>) -> Result<(), PoolError> {
        if conn.pool_id() != self.inner.id {
            return Err(PoolError::Rejected(format!(
                "connection {} belongs to another pool",
                conn.id()
            )));
        }

        let mut state = self.inner.state.lock().expect("pool mutex poisoned");
        if !conn.is_broken() && state.idle.len() < self.inner.config.max_idle {
            state.idle.push_back(conn);
        } else {
            // Dropping the last handle closes the socket.
            state.total = state.total.saturating_sub(1);
        }
        Ok(())
    }

    fn is_healthy(&self, conn: &Connection) -> bool {
        if conn.is_broken() {
            return false;
        }
        if conn.probe() {
            return true;
        }
        // A connection that answers PING wrongly is not handed out again.
        debug!(conn = conn.id(), "health probe failed");
        conn.mark_broken();
        false
    }
}

impl std::fmt::Debug for TcpPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TcpPool")
            .field("addr", &self.inner.addr)
            .field("status", &self.status())
            .finish()
    }
}
