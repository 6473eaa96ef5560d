//! Storage-specific error types for SQLite operations.
//!
//! Wraps Diesel and r2d2 errors and converts them to the database-agnostic
//! `stockpulse_core::Error` before they cross the crate boundary.

use diesel::result::Error as DieselError;
use stockpulse_core::Error;
use thiserror::Error;

/// Errors internal to the storage layer.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("database connection failed: {0}")]
    ConnectionFailed(#[from] diesel::ConnectionError),

    #[error("connection pool error: {0}")]
    PoolError(#[from] r2d2::Error),

    #[error("query execution failed: {0}")]
    QueryFailed(#[from] DieselError),

    #[error("migration failed: {0}")]
    MigrationFailed(String),

    #[error("stored value could not be decoded: {0}")]
    Decode(String),

    #[error("core error: {0}")]
    CoreError(String),
}

/// Lets write-actor jobs return the caller-facing error type while the
/// transaction wrapper works in `StorageError`.
impl From<Error> for StorageError {
    fn from(err: Error) -> Self {
        StorageError::CoreError(err.to_string())
    }
}

impl From<StorageError> for Error {
    fn from(err: StorageError) -> Self {
        match err {
            // Already a stringified core error, unwrap rather than re-wrap.
            StorageError::CoreError(message) => Error::Database(message),
            other => Error::Database(other.to_string()),
        }
    }
}

/// Extension trait for converting Diesel and r2d2 Results to core Results.
///
/// Orphan rules prevent `From<DieselError> for Error`, so the conversion goes
/// through `StorageError` via this trait instead.
pub trait IntoCore<T> {
    fn into_core(self) -> stockpulse_core::Result<T>;
}

impl<T> IntoCore<T> for std::result::Result<T, DieselError> {
    fn into_core(self) -> stockpulse_core::Result<T> {
        self.map_err(|e| StorageError::from(e).into())
    }
}

impl<T> IntoCore<T> for std::result::Result<T, r2d2::Error> {
    fn into_core(self) -> stockpulse_core::Result<T> {
        self.map_err(|e| StorageError::from(e).into())
    }
}
