//! DataStore trait definition.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use oms_domain::{Order, OrderItem, OrderStatus, Policy, ProcessingStatus, Product, User, UserGroup};

use crate::error::{HealthStatus, StorageError, StorageResult};

/// Fields of a product before the backend has assigned an id.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub stock_quantity: i32,
    pub category: Option<String>,
}

/// Fields of an order before the backend has assigned an id.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub customer_name: String,
    pub customer_email: String,
    pub status: OrderStatus,
    pub order_date: DateTime<Utc>,
    pub total_amount: Decimal,
    pub items: Vec<OrderItem>,
}

/// A stock reduction to apply atomically alongside an order placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockDecrement {
    pub product_id: i64,
    pub quantity: i32,
}

/// Rejects blank job identifiers before they reach a backend.
pub fn validate_job_id(job_id: &str) -> StorageResult<()> {
    if job_id.trim().is_empty() {
        return Err(StorageError::InvalidInput {
            message: "job_id must not be blank".to_string(),
        });
    }
    Ok(())
}

/// Abstract repository interface for OMS data.
///
/// Every operation is an explicit find/save/delete by identifier; the one
/// composite write is [`place_order`](DataStore::place_order), which is the
/// unit-of-work boundary for checkout: stock verification, stock decrements,
/// and the order insert succeed or fail as a whole.
///
/// Implementations must be thread-safe (`Send + Sync`) and support async
/// operations.
#[async_trait]
pub trait DataStore: Send + Sync + 'static {
    // Product operations

    /// Creates a product and assigns its id.
    async fn create_product(&self, product: NewProduct) -> StorageResult<Product>;

    /// Gets a product by id.
    async fn get_product(&self, id: i64) -> StorageResult<Product>;

    /// Lists all products.
    async fn list_products(&self) -> StorageResult<Vec<Product>>;

    /// Saves an existing product, replacing its stored fields.
    async fn update_product(&self, product: Product) -> StorageResult<Product>;

    /// Deletes a product by id.
    async fn delete_product(&self, id: i64) -> StorageResult<()>;

    // Order operations

    /// Atomically verifies stock, applies the decrements, and inserts the
    /// order with its items. No partial effect remains on failure.
    async fn place_order(
        &self,
        order: NewOrder,
        decrements: Vec<StockDecrement>,
    ) -> StorageResult<Order>;

    /// Gets an order (with items) by id.
    async fn get_order(&self, id: i64) -> StorageResult<Order>;

    /// Lists all orders with their items.
    async fn list_orders(&self) -> StorageResult<Vec<Order>>;

    /// Saves an existing order, replacing its stored fields.
    async fn update_order(&self, order: Order) -> StorageResult<Order>;

    /// Deletes an order and its items by id.
    async fn delete_order(&self, id: i64) -> StorageResult<()>;

    /// Updates just the status of an order.
    async fn update_order_status(&self, id: i64, status: OrderStatus) -> StorageResult<()>;

    // Job progress operations

    /// Gets a job progress record by job id.
    async fn get_job(&self, job_id: &str) -> StorageResult<ProcessingStatus>;

    /// Upserts a job progress record.
    async fn save_job(&self, job: &ProcessingStatus) -> StorageResult<()>;

    // Access-control operations
    //
    // The resolver consumes full snapshots; these are the "fetch all"
    // collaborator calls it needs, plus upserts for administration.

    /// Lists all access-control users.
    async fn list_users(&self) -> StorageResult<Vec<User>>;

    /// Lists all user groups.
    async fn list_groups(&self) -> StorageResult<Vec<UserGroup>>;

    /// Lists all policies.
    async fn list_policies(&self) -> StorageResult<Vec<Policy>>;

    /// Upserts a user record.
    async fn put_user(&self, user: User) -> StorageResult<()>;

    /// Upserts a user group record.
    async fn put_group(&self, group: UserGroup) -> StorageResult<()>;

    /// Upserts a policy record.
    async fn put_policy(&self, policy: Policy) -> StorageResult<()>;

    // Health

    /// Reports backend health for readiness probes.
    async fn health_check(&self) -> HealthStatus;
}
