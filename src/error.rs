use std::sync::Arc;
use thiserror::Error;

/// Represents errors that can occur while using a pool.
///
/// The type is `Clone` so a single error can be reported through every
/// accessor of an [`ExecResult`](crate::udbc::result::ExecResult).
#[derive(Error, Debug, Clone)]
pub enum DbError {
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Driver error: {0}")]
    Driver(#[source] Arc<dyn std::error::Error + Send + Sync>),
    #[error("Connection error: {0}")]
    Connection(String),
    #[error("Query error: {0}")]
    Query(String),
    #[error("Value error: {0}")]
    Value(String),
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("No row found")]
    RowNotFound,
    #[error("operation timeout")]
    Timeout,
    #[error("pool is closed")]
    PoolClosed,
    #[error("operation aborted before producing a result")]
    Aborted,
}

impl DbError {
    /// Wraps any driver error, keeping it reachable through `source()`.
    pub fn driver<E>(e: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        DbError::Driver(Arc::new(e))
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, DbError::Timeout)
    }
}

impl serde::de::Error for DbError {
    fn custom<T: std::fmt::Display>(msg: T) -> Self {
        DbError::Value(msg.to_string())
    }
}

#[cfg(feature = "mysql")]
impl From<mysql_async::Error> for DbError {
    fn from(e: mysql_async::Error) -> Self {
        DbError::driver(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_driver_error_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset by peer");
        let err = DbError::driver(io);
        assert_eq!(err.to_string(), "Driver error: reset by peer");
        let source = err.source().unwrap();
        assert_eq!(source.to_string(), "reset by peer");

        // clones share the same source
        let copy = err.clone();
        assert!(copy.source().is_some());
    }
}
