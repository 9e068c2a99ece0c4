//! Typed errors for the store crate.

use std::fmt;

/// Errors raised while talking to the backing store.
#[derive(Debug)]
pub enum StoreError {
    /// Failed to establish or keep a connection to the database.
    ConnectionFailed(String),
    /// A statement was rejected or failed during execution.
    QueryFailed(String),
    /// A result row could not be decoded into the expected shape.
    Decode(String),
    /// Invalid or missing store configuration.
    ConfigError(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::ConnectionFailed(msg) => write!(f, "connection failed: {}", msg),
            StoreError::QueryFailed(msg) => write!(f, "query failed: {}", msg),
            StoreError::Decode(msg) => write!(f, "decode failed: {}", msg),
            StoreError::ConfigError(msg) => write!(f, "config error: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => StoreError::ConnectionFailed(e.to_string()),
            sqlx::Error::Configuration(_) => StoreError::ConfigError(e.to_string()),
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
                StoreError::Decode(e.to_string())
            }
            _ => StoreError::QueryFailed(e.to_string()),
        }
    }
}
