//! # Pool Contract
//!
//! The proxy consumes a pool through this trait only. Sizing, eviction and
//! connection establishment belong to the implementation.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

/// Static description of the operations a connection type exposes.
///
/// Method identities are matched ASCII case-insensitively, which lets RESP
/// command names be used directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComponentType {
    name: &'static str,
    methods: &'static [&'static str],
}

impl ComponentType {
    /// Describes a connection type by name and declared methods.
    pub const fn new(name: &'static str, methods: &'static [&'static str]) -> Self {
        ComponentType { name, methods }
    }

    /// Name used in logs and errors.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Declared method identities.
    pub fn methods(&self) -> &'static [&'static str] {
        self.methods
    }

    /// Returns true when `method` is declared by this component type.
    pub fn supports(&self, method: &str) -> bool {
        self.methods
            .iter()
            .any(|declared| declared.eq_ignore_ascii_case(method))
    }
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Failures reported by a pool.
#[derive(Debug, Error)]
pub enum PoolError {
    /// Pool is at capacity and no idle connection is available.
    #[error("connection pool exhausted")]
    Exhausted,
    /// A new connection could not be established.
    #[error("failed to open connection: {0}")]
    Connection(#[source] Box<dyn std::error::Error + Send + Sync>),
    /// The pool refused a returned connection.
    #[error("connection rejected by pool: {0}")]
    Rejected(String),
}

/// Borrow/return/health-check primitives of a thread-safe connection pool.
pub trait ConnectionPool: Send + Sync {
    /// Connection type handed out on loan.
    type Connection: Send + Sync;

    /// Describes the capability interface of `Self::Connection`.
    ///
    /// Returning `None` means the pool cannot be proxied.
    fn component_type(&self) -> Option<ComponentType>;

    /// Borrows a connection. May block while the pool is saturated.
    fn borrow(&self) -> Result<Arc<Self::Connection>, PoolError>;

    /// Returns a borrowed connection to the pool.
    fn release(&self, conn: Arc<Self::Connection>) -> Result<(), PoolError>;

    /// Checks whether a borrowed connection is still usable.
    fn is_healthy(&self, conn: &Self::Connection) -> bool;
}

impl<P: ConnectionPool + ?Sized> ConnectionPool for Arc<P> {
    type Connection = P::Connection;

    fn component_type(&self) -> Option<ComponentType> {
        (**self).component_type()
    }

    fn borrow(&self) -> Result<Arc<Self::Connection>, PoolError> {
        (**self).borrow()
    }

    fn release(&self, conn: Arc<Self::Connection>) -> Result<(), PoolError> {
        (**self).release(conn)
    }

    fn is_healthy(&self, conn: &Self::Connection) -> bool {
        (**self).is_healthy(conn)
    }
}
