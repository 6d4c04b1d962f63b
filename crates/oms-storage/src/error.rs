//! Storage error types.

use thiserror::Error;

/// Storage-specific errors.
///
/// The inability to load or persist data is a separate failure category from
/// a domain-level deny or validation error; it is surfaced here and mapped to
/// a 5xx by the HTTP layer, never folded into a business result.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Product not found.
    #[error("product not found: {product_id}")]
    ProductNotFound { product_id: i64 },

    /// Order not found.
    #[error("order not found: {order_id}")]
    OrderNotFound { order_id: i64 },

    /// Job not found.
    #[error("job not found: {job_id}")]
    JobNotFound { job_id: String },

    /// Not enough stock to satisfy an order placement write.
    #[error("insufficient stock for product {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: i64,
        requested: i32,
        available: i32,
    },

    /// Invalid input rejected before touching the backend.
    #[error("invalid input: {message}")]
    InvalidInput { message: String },

    /// Database connection error.
    #[error("database connection error: {message}")]
    ConnectionError { message: String },

    /// Database query error.
    #[error("database query error: {message}")]
    QueryError { message: String },

    /// Transaction error.
    #[error("transaction error: {message}")]
    TransactionError { message: String },

    /// Migration error.
    #[error("migration error: {message}")]
    MigrationError { message: String },

    /// Stored value could not be decoded into a domain type.
    #[error("corrupt record: {message}")]
    CorruptRecord { message: String },
}

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                StorageError::ConnectionError {
                    message: err.to_string(),
                }
            }
            other => StorageError::QueryError {
                message: other.to_string(),
            },
        }
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Health of a storage backend, reported by readiness probes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Backend is reachable and serving queries.
    Healthy,
    /// Backend is unreachable or failing; the message says why.
    Unhealthy { message: String },
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(self, HealthStatus::Healthy)
    }
}
