//! Custom error types for the common library
//!
//! This module defines the store-level error type. Persistence failures stay
//! typed here so the API boundary can translate them into its own taxonomy
//! instead of leaking raw driver errors.

use sqlx::Error as SqlxError;
use thiserror::Error;

/// Custom error type for document store operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Error occurred while connecting to the database
    #[error("store connection error: {0}")]
    Connection(#[source] SqlxError),

    /// Error occurred while executing a query
    #[error("store query error: {0}")]
    Query(#[source] SqlxError),

    /// A unique constraint was violated
    #[error("duplicate value: {0}")]
    Duplicate(String),

    /// Error occurred while running migrations
    #[error("store migration error: {0}")]
    Migration(String),

    /// Configuration error
    #[error("store configuration error: {0}")]
    Configuration(String),
}

impl StoreError {
    /// Classify a sqlx error raised by a query. Unique violations
    /// (SQLSTATE 23505) become `Duplicate` so callers can map them to a
    /// 400-class response.
    pub fn from_query(err: SqlxError) -> Self {
        if let Some(db_err) = err.as_database_error() {
            if db_err.code().as_deref() == Some("23505") {
                return StoreError::Duplicate(db_err.message().to_string());
            }
        }
        StoreError::Query(err)
    }
}

/// Type alias for Result with StoreError
pub type StoreResult<T> = Result<T, StoreError>;
