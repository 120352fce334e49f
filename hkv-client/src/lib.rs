//! # HybridKV Sync Client
//!
//! Purpose: Provide a lightweight, synchronous Redis-compatible client whose
//! handle borrows pooled connections transparently, so callers never acquire
//! or release connections themselves.
//!
//! ## Design Principles
//! 1. **Object Pool Pattern**: Reuse TCP connections to avoid repeated connects.
//! 2. **Proxy Pattern**: `KVClient` is a `TransparentPoolingProxy` over
//!    `TcpPool` and exposes the same `KvCommands` as a raw `Connection`.
//! 3. **Minimal Allocation**: Reuse buffers for RESP framing and parsing.
//! 4. **Protocol Clarity**: Encode/parse RESP2 explicitly for correctness.

mod commands;
mod config;
mod connection;
mod error;
mod pool;
mod resp;

pub use commands::{ClientTtl, KvCommands, KV_COMMANDS};
pub use config::ClientConfig;
pub use connection::Connection;
pub use error::{ClientError, ClientResult};
pub use hkv_pooling::{ConnectionPool, ProxyError, ProxyStatsSnapshot, TransparentPoolingProxy};
pub use pool::{PoolConfig, PoolStatus, TcpPool};
pub use resp::RespValue;

/// Pooled client handle.
pub type KVClient = TransparentPoolingProxy<TcpPool>;

/// Creates a pooled client with default configuration.
pub fn connect(addr: impl Into<String>) -> ClientResult<KVClient> {
    let config = ClientConfig {
        addr: addr.into(),
        ..ClientConfig::default()
    };
    open(config)
}

/// Creates a pooled client with a custom configuration.
pub fn open(config: ClientConfig) -> ClientResult<KVClient> {
    let pool = TcpPool::new(config.pool_config())?;
    Ok(TransparentPoolingProxy::with_recheck_interval(
        pool,
        config.recheck_interval,
    )?)
}
