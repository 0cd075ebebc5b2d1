//! Error types for the operation core
//!
//! Business-rule failures (bad range, self bump, ...) are never errors: they are
//! recorded as result codes on the operation. The variants here cover storage,
//! configuration and broken internal invariants only.

use thiserror::Error;

/// Result type for ledger operations
pub type Result<T> = std::result::Result<T, Error>;

/// Ledger errors
#[derive(Error, Debug)]
pub enum Error {
    /// Storage error (RocksDB)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// Account not present in the ledger
    #[error("Account not found: {0}")]
    AccountNotFound(String),

    /// Account already present in the ledger
    #[error("Account already exists: {0}")]
    AccountExists(String),

    /// Invariant violation (sequence regression, double apply, etc.)
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// Metrics registration error
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<rocksdb::Error> for Error {
    fn from(err: rocksdb::Error) -> Self {
        Error::Storage(err.to_string())
    }
}
