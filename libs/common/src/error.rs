//! Custom error types for the common library
//!
//! This module defines the infrastructure error types shared by the
//! services: one for the PostgreSQL pool and one for the Redis cache.

use redis::RedisError;
use sqlx::Error as SqlxError;
use sqlx::migrate::MigrateError;
use thiserror::Error;

/// Custom error type for database operations
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Error occurred during database connection
    #[error("Database connection error: {0}")]
    Connection(#[source] SqlxError),

    /// Error occurred during database query execution
    #[error("Database query error: {0}")]
    Query(#[source] SqlxError),

    /// Error occurred during database migration
    #[error("Database migration error: {0}")]
    Migration(#[source] MigrateError),

    /// Configuration error
    #[error("Database configuration error: {0}")]
    Configuration(String),
}

/// Custom error type for cache operations
#[derive(Error, Debug)]
pub enum CacheError {
    /// The cache could not be reached or the connection dropped
    #[error("Cache connection error: {0}")]
    Connection(#[source] RedisError),

    /// A cache command was rejected
    #[error("Cache command error: {0}")]
    Command(#[source] RedisError),

    /// Configuration error
    #[error("Cache configuration error: {0}")]
    Configuration(String),
}

impl CacheError {
    /// Classify a redis error raised while running a command.
    ///
    /// Dropped or refused connections count as connectivity failures so that
    /// callers can tell an outage apart from a bad command.
    pub fn from_command(err: RedisError) -> Self {
        if err.is_io_error() || err.is_connection_dropped() || err.is_connection_refusal() {
            CacheError::Connection(err)
        } else {
            CacheError::Command(err)
        }
    }
}

/// Type alias for Result with DatabaseError
pub type DatabaseResult<T> = Result<T, DatabaseError>;

/// Type alias for Result with CacheError
pub type CacheResult<T> = Result<T, CacheError>;
