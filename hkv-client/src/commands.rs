//! # Command API
//!
//! Purpose: Declare the command set shared by direct connections and pooling
//! proxies, so a proxy can stand in wherever a connection is expected.
//!
//! ## Design Principles
//! 1. **Template Method**: Typed commands are provided methods built on the
//!    single required `exec`, so every implementor interprets replies the
//!    same way.
//! 2. **Proxy Pattern**: `TransparentPoolingProxy` overrides every method and
//!    forwards it, unchanged, to the connection it holds on loan.
//! 3. **Borrow-Friendly API**: Accept `&[u8]` to avoid unnecessary copies.

use std::borrow::Cow;
use std::time::Duration;

use hkv_pooling::{ComponentType, ConnectionPool, TransparentPoolingProxy};

use crate::error::{ClientError, ClientResult};
use crate::resp::RespValue;

/// Commands a connection understands, by RESP command name.
pub const KV_COMMANDS: ComponentType = ComponentType::new(
    "hkv-client::Connection",
    &["GET", "SET", "DEL", "EXPIRE", "TTL", "PING", "INFO"],
);

/// TTL state returned by the server, mirroring Redis semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientTtl {
    /// Key is missing or already expired.
    Missing,
    /// Key exists without expiration.
    NoExpiry,
    /// Key expires after the provided duration.
    ExpiresIn(Duration),
}

/// Redis-compatible command set.
pub trait KvCommands {
    /// Executes a raw command and returns the reply, error replies included.
    fn exec(&self, args: &[&[u8]]) -> ClientResult<RespValue>;

    /// Fetches a value by key.
    ///
    /// Returns `Ok(None)` when the key is missing.
    fn get(&self, key: &[u8]) -> ClientResult<Option<Vec<u8>>> {
        match self.exec(&[b"GET", key])?.into_result()? {
            RespValue::Bulk(data) => Ok(data),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    /// Sets a value for a key without expiration.
    fn set(&self, key: &[u8], value: &[u8]) -> ClientResult<()> {
        match self.exec(&[b"SET", key, value])?.into_result()? {
            RespValue::Simple(_) => Ok(()),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    /// Sets a value and attaches an expiration in seconds.
    fn set_with_ttl(&self, key: &[u8], value: &[u8], ttl: Duration) -> ClientResult<()> {
        let (seconds, len) = encode_u64(ttl.as_secs());
        match self.exec(&[b"SET", key, value, b"EX", &seconds[..len]])?.into_result()? {
            RespValue::Simple(_) => Ok(()),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    /// Deletes a key. Returns true when a key was removed.
    fn delete(&self, key: &[u8]) -> ClientResult<bool> {
        match self.exec(&[b"DEL", key])?.into_result()? {
            RespValue::Integer(count) => Ok(count > 0),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    /// Sets a time-to-live on a key. Returns true when the TTL was set.
    fn expire(&self, key: &[u8], ttl: Duration) -> ClientResult<bool> {
        let (seconds, len) = encode_u64(ttl.as_secs());
        match self.exec(&[b"EXPIRE", key, &seconds[..len]])?.into_result()? {
            RespValue::Integer(value) => Ok(value == 1),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    /// Returns TTL status for a key.
    fn ttl(&self, key: &[u8]) -> ClientResult<ClientTtl> {
        match self.exec(&[b"TTL", key])?.into_result()? {
            RespValue::Integer(-2) => Ok(ClientTtl::Missing),
            RespValue::Integer(-1) => Ok(ClientTtl::NoExpiry),
            RespValue::Integer(value) if value >= 0 => {
                Ok(ClientTtl::ExpiresIn(Duration::from_secs(value as u64)))
            }
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    /// Pings the server. Returns the raw response payload.
    fn ping(&self, payload: Option<&[u8]>) -> ClientResult<Vec<u8>> {
        let reply = match payload {
            Some(data) => self.exec(&[b"PING", data])?,
            None => self.exec(&[b"PING"])?,
        };
        match reply.into_result()? {
            RespValue::Simple(text) => Ok(text),
            RespValue::Bulk(Some(data)) => Ok(data),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    /// Fetches server INFO output.
    fn info(&self) -> ClientResult<Vec<u8>> {
        match self.exec(&[b"INFO"])?.into_result()? {
            RespValue::Bulk(Some(data)) => Ok(data),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }
}

impl<P> KvCommands for TransparentPoolingProxy<P>
where
    P: ConnectionPool,
    P::Connection: KvCommands,
{
    fn exec(&self, args: &[&[u8]]) -> ClientResult<RespValue> {
        let method = args
            .first()
            .map(|name| String::from_utf8_lossy(name))
            .unwrap_or(Cow::Borrowed(""));
        self.dispatch(&method, |conn| conn.exec(args))
    }

    fn get(&self, key: &[u8]) -> ClientResult<Option<Vec<u8>>> {
        self.dispatch("GET", |conn| conn.get(key))
    }

    fn set(&self, key: &[u8], value: &[u8]) -> ClientResult<()> {
        self.dispatch("SET", |conn| conn.set(key, value))
    }

    fn set_with_ttl(&self, key: &[u8], value: &[u8], ttl: Duration) -> ClientResult<()> {
        self.dispatch("SET", |conn| conn.set_with_ttl(key, value, ttl))
    }

    fn delete(&self, key: &[u8]) -> ClientResult<bool> {
        self.dispatch("DEL", |conn| conn.delete(key))
    }

    fn expire(&self, key: &[u8], ttl: Duration) -> ClientResult<bool> {
        self.dispatch("EXPIRE", |conn| conn.expire(key, ttl))
    }

    fn ttl(&self, key: &[u8]) -> ClientResult<ClientTtl> {
        self.dispatch("TTL", |conn| conn.ttl(key))
    }

    fn ping(&self, payload: Option<&[u8]>) -> ClientResult<Vec<u8>> {
        self.dispatch("PING", |conn| conn.ping(payload))
    }

    fn info(&self) -> ClientResult<Vec<u8>> {
        self.dispatch("INFO", |conn| conn.info())
    }
}

fn encode_u64(mut value: u64) -> ([u8; 20], usize) {
    // Stack buffer keeps conversion allocation-free.
    let mut buf = [0u8; 20];
    let mut len = 0;
    if value == 0 {
        buf[0] = b'0';
        return (buf, 1);
    }
    while value > 0 {
        buf[len] = b'0' + (value % 10) as u8;
        value /= 10;
        len += 1;
    }
    buf[..len].reverse();
    (buf, len)
}
