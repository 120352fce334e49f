use thiserror::Error;

use crate::pool::PoolError;

/// Failures raised by the proxy itself rather than by a forwarded call.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// The pool does not describe a usable capability interface.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// A required refresh could not obtain a connection.
    #[error("connection unavailable: {0}")]
    ConnectionUnavailable(#[source] PoolError),
    /// The call targets a method the component type does not declare.
    #[error("unsupported operation `{method}` on {component}")]
    UnsupportedOperation {
        method: String,
        component: &'static str,
    },
}

/// Separates broken-connection failures from errors a healthy connection
/// returns on purpose.
///
/// The proxy drops its cached connection as soon as a forwarded call reports
/// a connection failure.
pub trait ConnectionFailure {
    fn is_connection_failure(&self) -> bool;
}
