//! Domain error types for order-management operations.

use rust_decimal::Decimal;
use thiserror::Error;

/// Domain-specific errors for order-management operations.
///
/// The permission resolver never raises any of these: absent users, dangling
/// references, and empty relations all fold into a deny result. These errors
/// cover the order/product/job workflows only.
#[derive(Debug, Error)]
pub enum DomainError {
    /// Input failed validation (blank customer fields, empty order, ...).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// Requested quantity is not positive.
    #[error("quantity must be positive: {quantity}")]
    InvalidQuantity { quantity: i32 },

    /// Not enough stock to satisfy the requested quantity.
    #[error("insufficient stock for product {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: i64,
        requested: i32,
        available: i32,
    },

    /// Product price must be positive.
    #[error("price must be positive: {price}")]
    InvalidPrice { price: Decimal },

    /// Referenced product does not exist.
    #[error("product not found: {product_id}")]
    ProductNotFound { product_id: i64 },

    /// Referenced order does not exist.
    #[error("order not found: {order_id}")]
    OrderNotFound { order_id: i64 },

    /// Referenced job does not exist.
    #[error("job not found: {job_id}")]
    JobNotFound { job_id: String },
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
