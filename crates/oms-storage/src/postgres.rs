//! PostgreSQL storage implementation.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use tracing::{debug, instrument};

use oms_domain::{
    Order, OrderItem, OrderStatus, Policy, ProcessingStatus, Product, User, UserGroup,
};

use crate::error::{HealthStatus, StorageError, StorageResult};
use crate::traits::{validate_job_id, DataStore, NewOrder, NewProduct, StockDecrement};

/// Connection settings for [`PostgresDataStore`].
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            database_url: String::new(),
            max_connections: 10,
            min_connections: 1,
            connect_timeout_secs: 30,
        }
    }
}

/// PostgreSQL implementation of [`DataStore`].
///
/// Order placement runs inside a single transaction with `SELECT ... FOR
/// UPDATE` on the touched product rows, so stock verification, the
/// decrements, and the order insert commit or roll back together.
#[derive(Debug, Clone)]
pub struct PostgresDataStore {
    pool: PgPool,
}

impl PostgresDataStore {
    /// Connects a pool using the given configuration.
    pub async fn from_config(config: &PostgresConfig) -> StorageResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .connect(&config.database_url)
            .await
            .map_err(|e| StorageError::ConnectionError {
                message: e.to_string(),
            })?;
        Ok(Self { pool })
    }

    /// Wraps an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Applies the embedded schema migrations.
    pub async fn run_migrations(&self) -> StorageResult<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StorageError::MigrationError {
                message: e.to_string(),
            })
    }
}

fn row_to_product(row: &PgRow) -> Product {
    Product {
        id: row.get("id"),
        name: row.get("name"),
        description: row.get("description"),
        price: row.get("price"),
        stock_quantity: row.get("stock_quantity"),
        category: row.get("category"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn row_to_order(row: &PgRow, items: Vec<OrderItem>) -> StorageResult<Order> {
    let status: String = row.get("status");
    let status = status
        .parse::<OrderStatus>()
        .map_err(|e| StorageError::CorruptRecord {
            message: e.to_string(),
        })?;
    Ok(Order {
        id: row.get("id"),
        customer_name: row.get("customer_name"),
        customer_email: row.get("customer_email"),
        status,
        order_date: row.get("order_date"),
        total_amount: row.get("total_amount"),
        items,
    })
}

fn row_to_item(row: &PgRow) -> OrderItem {
    OrderItem {
        product_id: row.get("product_id"),
        quantity: row.get("quantity"),
        price: row.get("price"),
    }
}

fn row_to_job(row: &PgRow) -> StorageResult<ProcessingStatus> {
    let state: String = row.get("state");
    let state = state.parse().map_err(|e: oms_domain::DomainError| {
        StorageError::CorruptRecord {
            message: e.to_string(),
        }
    })?;
    let processed: i32 = row.get("processed");
    let total: i32 = row.get("total");
    let percent: i16 = row.get("percent");
    Ok(ProcessingStatus {
        job_id: row.get("job_id"),
        state,
        processed: processed.max(0) as u32,
        total: total.max(0) as u32,
        percent: percent.clamp(0, 100) as u8,
        error: row.get("error"),
        updated_at: row.get("updated_at"),
    })
}

#[async_trait]
impl DataStore for PostgresDataStore {
    async fn create_product(&self, product: NewProduct) -> StorageResult<Product> {
        let row = sqlx::query(
            r"INSERT INTO products (name, description, price, stock_quantity, category)
              VALUES ($1, $2, $3, $4, $5)
              RETURNING id, name, description, price, stock_quantity, category,
                        created_at, updated_at",
        )
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price)
        .bind(product.stock_quantity)
        .bind(&product.category)
        .fetch_one(&self.pool)
        .await?;
        Ok(row_to_product(&row))
    }

    async fn get_product(&self, id: i64) -> StorageResult<Product> {
        let row = sqlx::query(
            r"SELECT id, name, description, price, stock_quantity, category,
                     created_at, updated_at
              FROM products WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StorageError::ProductNotFound { product_id: id })?;
        Ok(row_to_product(&row))
    }

    async fn list_products(&self) -> StorageResult<Vec<Product>> {
        let rows = sqlx::query(
            r"SELECT id, name, description, price, stock_quantity, category,
                     created_at, updated_at
              FROM products ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(row_to_product).collect())
    }

    async fn update_product(&self, product: Product) -> StorageResult<Product> {
        let row = sqlx::query(
            r"UPDATE products
              SET name = $2, description = $3, price = $4, stock_quantity = $5,
                  category = $6, updated_at = now()
              WHERE id = $1
              RETURNING id, name, description, price, stock_quantity, category,
                        created_at, updated_at",
        )
        .bind(product.id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price)
        .bind(product.stock_quantity)
        .bind(&product.category)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StorageError::ProductNotFound {
            product_id: product.id,
        })?;
        Ok(row_to_product(&row))
    }

    async fn delete_product(&self, id: i64) -> StorageResult<()> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StorageError::ProductNotFound { product_id: id });
        }
        Ok(())
    }

    #[instrument(skip(self, order, decrements), fields(lines = order.items.len()))]
    async fn place_order(
        &self,
        order: NewOrder,
        decrements: Vec<StockDecrement>,
    ) -> StorageResult<Order> {
        let mut tx = self.pool.begin().await?;

        // Lock the touched product rows, then verify before mutating.
        for dec in &decrements {
            let row = sqlx::query("SELECT stock_quantity FROM products WHERE id = $1 FOR UPDATE")
                .bind(dec.product_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or(StorageError::ProductNotFound {
                    product_id: dec.product_id,
                })?;
            let available: i32 = row.get("stock_quantity");
            if dec.quantity > available {
                return Err(StorageError::InsufficientStock {
                    product_id: dec.product_id,
                    requested: dec.quantity,
                    available,
                });
            }
            sqlx::query(
                "UPDATE products SET stock_quantity = stock_quantity - $2, updated_at = now()
                 WHERE id = $1",
            )
            .bind(dec.product_id)
            .bind(dec.quantity)
            .execute(&mut *tx)
            .await?;
        }

        let order_row = sqlx::query(
            r"INSERT INTO orders (customer_name, customer_email, status, order_date, total_amount)
              VALUES ($1, $2, $3, $4, $5)
              RETURNING id, customer_name, customer_email, status, order_date, total_amount",
        )
        .bind(&order.customer_name)
        .bind(&order.customer_email)
        .bind(order.status.as_str())
        .bind(order.order_date)
        .bind(order.total_amount)
        .fetch_one(&mut *tx)
        .await?;
        let order_id: i64 = order_row.get("id");

        for item in &order.items {
            sqlx::query(
                "INSERT INTO order_items (order_id, product_id, quantity, price)
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(order_id)
            .bind(item.product_id)
            .bind(item.quantity)
            .bind(item.price)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit()
            .await
            .map_err(|e| StorageError::TransactionError {
                message: e.to_string(),
            })?;

        debug!(order_id, "order placed");
        row_to_order(&order_row, order.items)
    }

    async fn get_order(&self, id: i64) -> StorageResult<Order> {
        let row = sqlx::query(
            r"SELECT id, customer_name, customer_email, status, order_date, total_amount
              FROM orders WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StorageError::OrderNotFound { order_id: id })?;

        let items = sqlx::query(
            "SELECT product_id, quantity, price FROM order_items WHERE order_id = $1 ORDER BY id",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        row_to_order(&row, items.iter().map(row_to_item).collect())
    }

    async fn list_orders(&self) -> StorageResult<Vec<Order>> {
        let order_rows = sqlx::query(
            r"SELECT id, customer_name, customer_email, status, order_date, total_amount
              FROM orders ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        let item_rows = sqlx::query(
            "SELECT order_id, product_id, quantity, price FROM order_items ORDER BY order_id, id",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut items_by_order: HashMap<i64, Vec<OrderItem>> = HashMap::new();
        for row in &item_rows {
            let order_id: i64 = row.get("order_id");
            items_by_order
                .entry(order_id)
                .or_default()
                .push(row_to_item(row));
        }

        order_rows
            .iter()
            .map(|row| {
                let id: i64 = row.get("id");
                row_to_order(row, items_by_order.remove(&id).unwrap_or_default())
            })
            .collect()
    }

    async fn update_order(&self, order: Order) -> StorageResult<Order> {
        let result = sqlx::query(
            r"UPDATE orders
              SET customer_name = $2, customer_email = $3, status = $4, total_amount = $5
              WHERE id = $1",
        )
        .bind(order.id)
        .bind(&order.customer_name)
        .bind(&order.customer_email)
        .bind(order.status.as_str())
        .bind(order.total_amount)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StorageError::OrderNotFound { order_id: order.id });
        }
        self.get_order(order.id).await
    }

    async fn delete_order(&self, id: i64) -> StorageResult<()> {
        // order_items rows go with the order via ON DELETE CASCADE
        let result = sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StorageError::OrderNotFound { order_id: id });
        }
        Ok(())
    }

    async fn update_order_status(&self, id: i64, status: OrderStatus) -> StorageResult<()> {
        let result = sqlx::query("UPDATE orders SET status = $2 WHERE id = $1")
            .bind(id)
            .bind(status.as_str())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StorageError::OrderNotFound { order_id: id });
        }
        Ok(())
    }

    async fn get_job(&self, job_id: &str) -> StorageResult<ProcessingStatus> {
        let row = sqlx::query(
            r"SELECT job_id, state, processed, total, percent, error, updated_at
              FROM processing_status WHERE job_id = $1",
        )
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StorageError::JobNotFound {
            job_id: job_id.to_string(),
        })?;
        row_to_job(&row)
    }

    async fn save_job(&self, job: &ProcessingStatus) -> StorageResult<()> {
        validate_job_id(&job.job_id)?;
        sqlx::query(
            r"INSERT INTO processing_status (job_id, state, processed, total, percent, error, updated_at)
              VALUES ($1, $2, $3, $4, $5, $6, $7)
              ON CONFLICT (job_id) DO UPDATE
              SET state = EXCLUDED.state, processed = EXCLUDED.processed,
                  total = EXCLUDED.total, percent = EXCLUDED.percent,
                  error = EXCLUDED.error, updated_at = EXCLUDED.updated_at",
        )
        .bind(&job.job_id)
        .bind(job.state.as_str())
        .bind(job.processed as i32)
        .bind(job.total as i32)
        .bind(i16::from(job.percent))
        .bind(&job.error)
        .bind(job.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_users(&self) -> StorageResult<Vec<User>> {
        let rows = sqlx::query("SELECT id, group_ids FROM access_users")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .iter()
            .map(|row| User {
                id: row.get("id"),
                group_ids: row.get("group_ids"),
            })
            .collect())
    }

    async fn list_groups(&self) -> StorageResult<Vec<UserGroup>> {
        let rows = sqlx::query("SELECT id, policy_ids FROM access_groups")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .iter()
            .map(|row| UserGroup {
                id: row.get("id"),
                policy_ids: row.get("policy_ids"),
            })
            .collect())
    }

    async fn list_policies(&self) -> StorageResult<Vec<Policy>> {
        let rows = sqlx::query("SELECT id, statements FROM access_policies")
            .fetch_all(&self.pool)
            .await?;
        rows.iter()
            .map(|row| {
                let statements: serde_json::Value = row.get("statements");
                let statements = serde_json::from_value(statements).map_err(|e| {
                    StorageError::CorruptRecord {
                        message: format!("policy statements: {e}"),
                    }
                })?;
                Ok(Policy {
                    id: row.get("id"),
                    statements,
                })
            })
            .collect()
    }

    async fn put_user(&self, user: User) -> StorageResult<()> {
        sqlx::query(
            r"INSERT INTO access_users (id, group_ids) VALUES ($1, $2)
              ON CONFLICT (id) DO UPDATE SET group_ids = EXCLUDED.group_ids",
        )
        .bind(&user.id)
        .bind(&user.group_ids)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn put_group(&self, group: UserGroup) -> StorageResult<()> {
        sqlx::query(
            r"INSERT INTO access_groups (id, policy_ids) VALUES ($1, $2)
              ON CONFLICT (id) DO UPDATE SET policy_ids = EXCLUDED.policy_ids",
        )
        .bind(&group.id)
        .bind(&group.policy_ids)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn put_policy(&self, policy: Policy) -> StorageResult<()> {
        let statements =
            serde_json::to_value(&policy.statements).map_err(|e| StorageError::InvalidInput {
                message: format!("policy statements: {e}"),
            })?;
        sqlx::query(
            r"INSERT INTO access_policies (id, statements) VALUES ($1, $2)
              ON CONFLICT (id) DO UPDATE SET statements = EXCLUDED.statements",
        )
        .bind(&policy.id)
        .bind(statements)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn health_check(&self) -> HealthStatus {
        match sqlx::query("SELECT 1").execute(&self.pool).await {
            Ok(_) => HealthStatus::Healthy,
            Err(e) => HealthStatus::Unhealthy {
                message: e.to_string(),
            },
        }
    }
}
