//! # HybridKV Transparent Pooling
//!
//! Purpose: Hand callers one long-lived handle that behaves like a single
//! connection while every call is served by a validated connection borrowed
//! from a shared pool.
//!
//! ## Design Principles
//! 1. **Proxy Pattern**: `TransparentPoolingProxy` stands in for a connection
//!    and forwards each call to the connection it currently holds on loan.
//! 2. **Time-Boxed Trust**: A cached connection is reused without pool traffic
//!    until its recheck interval elapses.
//! 3. **Short Critical Sections**: Only the replace decision is serialized;
//!    forwarded calls run outside the lock.
//! 4. **Protocol Agnostic**: Pools and connections are described by traits, so
//!    this crate knows nothing about the wire protocol.

mod error;
mod policy;
mod pool;
mod proxy;
mod stats;

pub use error::{ConnectionFailure, ProxyError};
pub use policy::{RecheckPolicy, DEFAULT_RECHECK_INTERVAL};
pub use pool::{ComponentType, ConnectionPool, PoolError};
pub use proxy::TransparentPoolingProxy;
pub use stats::{ProxyStats, ProxyStatsSnapshot};
