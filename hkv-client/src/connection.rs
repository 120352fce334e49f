//! # TCP Connection
//!
//! A single RESP2 connection with reusable buffers. The stream sits behind a
//! mutex so one connection can be shared by every caller of a pooling proxy;
//! request/reply pairs never interleave.

use std::io::{BufReader, Write};
use std::net::{SocketAddr, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Instant;

use bytes::BytesMut;
use hkv_pooling::ConnectionFailure;
use tracing::trace;

use crate::commands::KvCommands;
use crate::error::{ClientError, ClientResult};
use crate::pool::PoolConfig;
use crate::resp::{encode_command, RespReader, RespValue};

struct Stream {
    // Buffered reader reduces syscalls while still allowing direct writes.
    reader: RespReader<BufReader<TcpStream>>,
    write_buf: BytesMut,
}

impl Stream {
    fn exec(&mut self, args: &[&[u8]]) -> ClientResult<RespValue> {
        self.write_buf.clear();
        encode_command(args, &mut self.write_buf);

        let stream = self.reader.get_mut().get_mut();
        stream.write_all(&self.write_buf)?;
        stream.flush()?;

        self.reader.read_value()
    }
}

/// One TCP connection to a RESP2 server.
pub struct Connection {
    id: u64,
    pool_id: u64,
    peer: SocketAddr,
    created_at: Instant,
    stream: Mutex<Stream>,
    broken: AtomicBool,
}

impl Connection {
    pub(crate) fn connect(
        config: &PoolConfig,
        addr: SocketAddr,
        pool_id: u64,
        id: u64,
    ) -> ClientResult<Self> {
        let stream = match config.connect_timeout {
            Some(timeout) => TcpStream::connect_timeout(&addr, timeout)?,
            None => TcpStream::connect(addr)?,
        };
        if let Some(timeout) = config.read_timeout {
            stream.set_read_timeout(Some(timeout))?;
        }
        if let Some(timeout) = config.write_timeout {
            stream.set_write_timeout(Some(timeout))?;
        }
        // Disable Nagle to keep request latency low for small payloads.
        stream.set_nodelay(true)?;

        Ok(Connection {
            id,
            pool_id,
            peer: addr,
            created_at: Instant::now(),
            stream: Mutex::new(Stream {
                reader: RespReader::new(BufReader::new(stream)),
                write_buf: BytesMut::with_capacity(256),
            }),
            broken: AtomicBool::new(false),
        })
    }

    /// Identifier unique within the owning pool.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub(crate) fn pool_id(&self) -> u64 {
        self.pool_id
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    /// Returns true once an IO or framing failure has been observed.
    pub fn is_broken(&self) -> bool {
        self.broken.load(Ordering::Acquire)
    }

    pub(crate) fn mark_broken(&self) {
        self.broken.store(true, Ordering::Release);
    }

    /// Executes one command and returns the raw reply.
    ///
    /// Error replies are returned as `RespValue::Error`. IO and framing
    /// failures mark the connection broken.
    pub fn exec(&self, args: &[&[u8]]) -> ClientResult<RespValue> {
        if self.is_broken() {
            return Err(ClientError::Protocol);
        }

        let result = self
            .stream
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .exec(args);
        if let Err(err) = &result {
            if err.is_connection_failure() {
                trace!(conn = self.id, peer = %self.peer, error = %err, "connection marked broken");
                self.mark_broken();
            }
        }
        result
    }

    /// Sends PING and expects PONG.
    pub fn probe(&self) -> bool {
        matches!(self.exec(&[b"PING"]), Ok(RespValue::Simple(reply)) if reply == b"PONG")
    }
}

impl KvCommands for Connection {
    fn exec(&self, args: &[&[u8]]) -> ClientResult<RespValue> {
        Connection::exec(self, args)
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("peer", &self.peer)
            .field("broken", &self.is_broken())
            .finish()
    }
}
