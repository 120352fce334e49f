use hkv_pooling::{ConnectionFailure, ProxyError};
use thiserror::Error;

/// Result type for the client.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors surfaced by the client, pooled or direct.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Network or IO failure while reading/writing.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// RESP2 framing or parse error.
    #[error("protocol error")]
    Protocol,
    /// Server returned an error reply.
    #[error("server error: {}", String::from_utf8_lossy(.message))]
    Server { message: Vec<u8> },
    /// Response type did not match the expected command response.
    #[error("unexpected response")]
    UnexpectedResponse,
    /// Address could not be parsed into a socket address.
    #[error("invalid address")]
    InvalidAddress,
    /// Configuration could not be decoded.
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
    /// Failure raised by the pooling layer.
    #[error(transparent)]
    Proxy(#[from] ProxyError),
}

impl ClientError {
    /// Returns true when the pool could not supply a connection.
    pub fn is_connection_unavailable(&self) -> bool {
        matches!(self, ClientError::Proxy(ProxyError::ConnectionUnavailable(_)))
    }
}

impl ConnectionFailure for ClientError {
    /// IO and framing failures leave the stream in an unknown state; server
    /// replies, even error replies, come from a working connection.
    fn is_connection_failure(&self) -> bool {
        matches!(self, ClientError::Io(_) | ClientError::Protocol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hkv_pooling::PoolError;

    #[test]
    fn classifies_connection_failures() {
        let io = ClientError::Io(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe"));
        assert!(io.is_connection_failure());
        assert!(ClientError::Protocol.is_connection_failure());
        assert!(!ClientError::Server { message: b"ERR".to_vec() }.is_connection_failure());
        assert!(!ClientError::UnexpectedResponse.is_connection_failure());
    }

    #[test]
    fn formats_server_error() {
        let err = ClientError::Server {
            message: b"ERR wrong number of arguments".to_vec(),
        };
        assert_eq!(err.to_string(), "server error: ERR wrong number of arguments");
    }

    #[test]
    fn detects_connection_unavailable() {
        let err = ClientError::from(ProxyError::ConnectionUnavailable(PoolError::Exhausted));
        assert!(err.is_connection_unavailable());
        assert_eq!(err.to_string(), "connection unavailable: connection pool exhausted");
    }
}
