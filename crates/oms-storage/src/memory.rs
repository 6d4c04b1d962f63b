//! In-memory storage implementation for tests and development.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;

use oms_domain::{Order, OrderStatus, Policy, ProcessingStatus, Product, User, UserGroup};

use crate::error::{HealthStatus, StorageError, StorageResult};
use crate::traits::{validate_job_id, DataStore, NewOrder, NewProduct, StockDecrement};

/// In-memory implementation of [`DataStore`].
///
/// # Performance characteristics
///
/// - Entity lookup/save/delete: O(1) average (DashMap)
/// - Listing: O(N) snapshot of the map
/// - Order placement: serialized by a single lock so that stock verification
///   and the decrements observe a consistent snapshot
///
/// Uses DashMap for thread-safe concurrent access without a global lock on
/// the read paths.
#[derive(Debug, Default)]
pub struct MemoryDataStore {
    products: DashMap<i64, Product>,
    orders: DashMap<i64, Order>,
    jobs: DashMap<String, ProcessingStatus>,
    users: DashMap<String, User>,
    groups: DashMap<String, UserGroup>,
    policies: DashMap<String, Policy>,
    next_product_id: AtomicI64,
    next_order_id: AtomicI64,
    /// Held across stock verification + decrement + order insert so two
    /// placements cannot both pass the stock check for the last unit.
    placement_lock: Mutex<()>,
}

impl MemoryDataStore {
    /// Creates a new in-memory data store.
    pub fn new() -> Self {
        Self {
            next_product_id: AtomicI64::new(1),
            next_order_id: AtomicI64::new(1),
            ..Self::default()
        }
    }

    /// Creates a new in-memory data store wrapped in Arc.
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    fn validate_product_fields(product: &Product) -> StorageResult<()> {
        product.validate().map_err(|e| StorageError::InvalidInput {
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl DataStore for MemoryDataStore {
    async fn create_product(&self, product: NewProduct) -> StorageResult<Product> {
        let now = Utc::now();
        let product = Product {
            id: self.next_product_id.fetch_add(1, Ordering::SeqCst),
            name: product.name,
            description: product.description,
            price: product.price,
            stock_quantity: product.stock_quantity,
            category: product.category,
            created_at: now,
            updated_at: now,
        };
        Self::validate_product_fields(&product)?;
        self.products.insert(product.id, product.clone());
        Ok(product)
    }

    async fn get_product(&self, id: i64) -> StorageResult<Product> {
        self.products
            .get(&id)
            .map(|p| p.value().clone())
            .ok_or(StorageError::ProductNotFound { product_id: id })
    }

    async fn list_products(&self) -> StorageResult<Vec<Product>> {
        let mut products: Vec<Product> =
            self.products.iter().map(|p| p.value().clone()).collect();
        products.sort_by_key(|p| p.id);
        Ok(products)
    }

    async fn update_product(&self, mut product: Product) -> StorageResult<Product> {
        Self::validate_product_fields(&product)?;
        let mut entry =
            self.products
                .get_mut(&product.id)
                .ok_or(StorageError::ProductNotFound {
                    product_id: product.id,
                })?;
        product.created_at = entry.created_at;
        product.updated_at = Utc::now();
        *entry = product.clone();
        Ok(product)
    }

    async fn delete_product(&self, id: i64) -> StorageResult<()> {
        self.products
            .remove(&id)
            .map(|_| ())
            .ok_or(StorageError::ProductNotFound { product_id: id })
    }

    async fn place_order(
        &self,
        order: NewOrder,
        decrements: Vec<StockDecrement>,
    ) -> StorageResult<Order> {
        let _guard = self
            .placement_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        // Sum the requested quantities per product, so repeated decrements
        // for one product are verified as a single total, then check every
        // total before applying any of them.
        let mut requested: HashMap<i64, i32> = HashMap::new();
        for dec in &decrements {
            *requested.entry(dec.product_id).or_insert(0) += dec.quantity;
        }

        for (&product_id, &quantity) in &requested {
            let product = self
                .products
                .get(&product_id)
                .ok_or(StorageError::ProductNotFound { product_id })?;
            if quantity > product.stock_quantity {
                return Err(StorageError::InsufficientStock {
                    product_id,
                    requested: quantity,
                    available: product.stock_quantity,
                });
            }
        }

        for (&product_id, &quantity) in &requested {
            if let Some(mut product) = self.products.get_mut(&product_id) {
                product.stock_quantity -= quantity;
                product.updated_at = Utc::now();
            }
        }

        let order = Order {
            id: self.next_order_id.fetch_add(1, Ordering::SeqCst),
            customer_name: order.customer_name,
            customer_email: order.customer_email,
            status: order.status,
            order_date: order.order_date,
            total_amount: order.total_amount,
            items: order.items,
        };
        self.orders.insert(order.id, order.clone());
        Ok(order)
    }

    async fn get_order(&self, id: i64) -> StorageResult<Order> {
        self.orders
            .get(&id)
            .map(|o| o.value().clone())
            .ok_or(StorageError::OrderNotFound { order_id: id })
    }

    async fn list_orders(&self) -> StorageResult<Vec<Order>> {
        let mut orders: Vec<Order> = self.orders.iter().map(|o| o.value().clone()).collect();
        orders.sort_by_key(|o| o.id);
        Ok(orders)
    }

    async fn update_order(&self, order: Order) -> StorageResult<Order> {
        let mut entry = self
            .orders
            .get_mut(&order.id)
            .ok_or(StorageError::OrderNotFound { order_id: order.id })?;
        *entry = order.clone();
        Ok(order)
    }

    async fn delete_order(&self, id: i64) -> StorageResult<()> {
        self.orders
            .remove(&id)
            .map(|_| ())
            .ok_or(StorageError::OrderNotFound { order_id: id })
    }

    async fn update_order_status(&self, id: i64, status: OrderStatus) -> StorageResult<()> {
        let mut entry = self
            .orders
            .get_mut(&id)
            .ok_or(StorageError::OrderNotFound { order_id: id })?;
        entry.status = status;
        Ok(())
    }

    async fn get_job(&self, job_id: &str) -> StorageResult<ProcessingStatus> {
        self.jobs
            .get(job_id)
            .map(|j| j.value().clone())
            .ok_or_else(|| StorageError::JobNotFound {
                job_id: job_id.to_string(),
            })
    }

    async fn save_job(&self, job: &ProcessingStatus) -> StorageResult<()> {
        validate_job_id(&job.job_id)?;
        self.jobs.insert(job.job_id.clone(), job.clone());
        Ok(())
    }

    async fn list_users(&self) -> StorageResult<Vec<User>> {
        Ok(self.users.iter().map(|u| u.value().clone()).collect())
    }

    async fn list_groups(&self) -> StorageResult<Vec<UserGroup>> {
        Ok(self.groups.iter().map(|g| g.value().clone()).collect())
    }

    async fn list_policies(&self) -> StorageResult<Vec<Policy>> {
        Ok(self.policies.iter().map(|p| p.value().clone()).collect())
    }

    async fn put_user(&self, user: User) -> StorageResult<()> {
        self.users.insert(user.id.clone(), user);
        Ok(())
    }

    async fn put_group(&self, group: UserGroup) -> StorageResult<()> {
        self.groups.insert(group.id.clone(), group);
        Ok(())
    }

    async fn put_policy(&self, policy: Policy) -> StorageResult<()> {
        self.policies.insert(policy.id.clone(), policy);
        Ok(())
    }

    async fn health_check(&self) -> HealthStatus {
        HealthStatus::Healthy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oms_domain::{OrderItem, Statement};
    use rust_decimal_macros::dec;

    fn new_product(name: &str, price: rust_decimal::Decimal, stock: i32) -> NewProduct {
        NewProduct {
            name: name.to_string(),
            description: None,
            price,
            stock_quantity: stock,
            category: None,
        }
    }

    fn new_order(total: rust_decimal::Decimal, items: Vec<OrderItem>) -> NewOrder {
        NewOrder {
            customer_name: "Alice".to_string(),
            customer_email: "alice@example.com".to_string(),
            status: OrderStatus::Processing,
            order_date: Utc::now(),
            total_amount: total,
            items,
        }
    }

    #[tokio::test]
    async fn create_and_get_product() {
        let store = MemoryDataStore::new();
        let created = store
            .create_product(new_product("Widget", dec!(9.99), 5))
            .await
            .unwrap();

        let fetched = store.get_product(created.id).await.unwrap();
        assert_eq!(fetched.name, "Widget");
        assert_eq!(fetched.stock_quantity, 5);
    }

    #[tokio::test]
    async fn product_ids_are_sequential() {
        let store = MemoryDataStore::new();
        let a = store
            .create_product(new_product("A", dec!(1.00), 1))
            .await
            .unwrap();
        let b = store
            .create_product(new_product("B", dec!(1.00), 1))
            .await
            .unwrap();
        assert!(b.id > a.id);
    }

    #[tokio::test]
    async fn create_product_rejects_invalid_fields() {
        let store = MemoryDataStore::new();
        let result = store.create_product(new_product(" ", dec!(1.00), 1)).await;
        assert!(matches!(result, Err(StorageError::InvalidInput { .. })));

        let result = store
            .create_product(new_product("Widget", dec!(0.00), 1))
            .await;
        assert!(matches!(result, Err(StorageError::InvalidInput { .. })));
    }

    #[tokio::test]
    async fn get_nonexistent_product_fails() {
        let store = MemoryDataStore::new();
        let result = store.get_product(42).await;
        assert!(matches!(
            result,
            Err(StorageError::ProductNotFound { product_id: 42 })
        ));
    }

    #[tokio::test]
    async fn update_product_preserves_created_at() {
        let store = MemoryDataStore::new();
        let mut created = store
            .create_product(new_product("Widget", dec!(9.99), 5))
            .await
            .unwrap();
        let original_created_at = created.created_at;

        created.price = dec!(19.99);
        let updated = store.update_product(created).await.unwrap();
        assert_eq!(updated.price, dec!(19.99));
        assert_eq!(updated.created_at, original_created_at);
    }

    #[tokio::test]
    async fn delete_product_removes_it() {
        let store = MemoryDataStore::new();
        let created = store
            .create_product(new_product("Widget", dec!(9.99), 5))
            .await
            .unwrap();
        store.delete_product(created.id).await.unwrap();
        assert!(store.get_product(created.id).await.is_err());
        assert!(store.delete_product(created.id).await.is_err());
    }

    #[tokio::test]
    async fn place_order_decrements_stock_and_stores_order() {
        let store = MemoryDataStore::new();
        let product = store
            .create_product(new_product("Widget", dec!(10.00), 5))
            .await
            .unwrap();

        let order = store
            .place_order(
                new_order(
                    dec!(35.00),
                    vec![OrderItem {
                        product_id: product.id,
                        quantity: 3,
                        price: dec!(10.00),
                    }],
                ),
                vec![StockDecrement {
                    product_id: product.id,
                    quantity: 3,
                }],
            )
            .await
            .unwrap();

        assert_eq!(order.items.len(), 1);
        assert_eq!(
            store.get_product(product.id).await.unwrap().stock_quantity,
            2
        );
        assert_eq!(store.get_order(order.id).await.unwrap().id, order.id);
    }

    #[tokio::test]
    async fn place_order_with_insufficient_stock_leaves_no_trace() {
        let store = MemoryDataStore::new();
        let cheap = store
            .create_product(new_product("Cheap", dec!(1.00), 10))
            .await
            .unwrap();
        let scarce = store
            .create_product(new_product("Scarce", dec!(1.00), 1))
            .await
            .unwrap();

        let result = store
            .place_order(
                new_order(dec!(7.00), vec![]),
                vec![
                    StockDecrement {
                        product_id: cheap.id,
                        quantity: 5,
                    },
                    StockDecrement {
                        product_id: scarce.id,
                        quantity: 2,
                    },
                ],
            )
            .await;

        assert!(matches!(
            result,
            Err(StorageError::InsufficientStock { requested: 2, .. })
        ));
        // First decrement must not have been applied.
        assert_eq!(store.get_product(cheap.id).await.unwrap().stock_quantity, 10);
        assert!(store.list_orders().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn repeated_decrements_for_one_product_are_verified_as_a_total() {
        let store = MemoryDataStore::new();
        let product = store
            .create_product(new_product("Scarce", dec!(2.00), 5))
            .await
            .unwrap();

        // Each decrement fits on its own; together they exceed stock.
        let result = store
            .place_order(
                new_order(dec!(12.00), vec![]),
                vec![
                    StockDecrement {
                        product_id: product.id,
                        quantity: 3,
                    },
                    StockDecrement {
                        product_id: product.id,
                        quantity: 3,
                    },
                ],
            )
            .await;

        assert!(matches!(
            result,
            Err(StorageError::InsufficientStock {
                requested: 6,
                available: 5,
                ..
            })
        ));
        assert_eq!(store.get_product(product.id).await.unwrap().stock_quantity, 5);
        assert!(store.list_orders().await.unwrap().is_empty());

        // A repeated pair that fits still places, applied once as its sum.
        store
            .place_order(
                new_order(dec!(8.00), vec![]),
                vec![
                    StockDecrement {
                        product_id: product.id,
                        quantity: 2,
                    },
                    StockDecrement {
                        product_id: product.id,
                        quantity: 2,
                    },
                ],
            )
            .await
            .unwrap();
        assert_eq!(store.get_product(product.id).await.unwrap().stock_quantity, 1);
    }

    #[tokio::test]
    async fn concurrent_placements_never_oversell() {
        let store = MemoryDataStore::new_shared();
        let product = store
            .create_product(new_product("Scarce", dec!(1.00), 10))
            .await
            .unwrap();

        let mut handles = Vec::new();
        for _ in 0..20 {
            let store = Arc::clone(&store);
            let product_id = product.id;
            handles.push(tokio::spawn(async move {
                store
                    .place_order(
                        new_order(dec!(6.00), vec![]),
                        vec![StockDecrement {
                            product_id,
                            quantity: 1,
                        }],
                    )
                    .await
            }));
        }

        let mut placed = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                placed += 1;
            }
        }

        assert_eq!(placed, 10);
        assert_eq!(
            store.get_product(product.id).await.unwrap().stock_quantity,
            0
        );
    }

    #[tokio::test]
    async fn order_status_update_and_delete() {
        let store = MemoryDataStore::new();
        let order = store
            .place_order(new_order(dec!(5.00), vec![]), vec![])
            .await
            .unwrap();

        store
            .update_order_status(order.id, OrderStatus::Shipped)
            .await
            .unwrap();
        assert_eq!(
            store.get_order(order.id).await.unwrap().status,
            OrderStatus::Shipped
        );

        store.delete_order(order.id).await.unwrap();
        assert!(matches!(
            store.get_order(order.id).await,
            Err(StorageError::OrderNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn job_records_upsert_and_fetch() {
        let store = MemoryDataStore::new();
        assert!(store.get_job("job-1").await.is_err());

        let mut job = ProcessingStatus::new("job-1");
        job.mark_running(3);
        store.save_job(&job).await.unwrap();

        job.update_progress(2, 3);
        store.save_job(&job).await.unwrap();

        let fetched = store.get_job("job-1").await.unwrap();
        assert_eq!(fetched.processed, 2);
        assert_eq!(fetched.percent, 66);
    }

    #[tokio::test]
    async fn save_job_rejects_blank_id() {
        let store = MemoryDataStore::new();
        let job = ProcessingStatus::new("  ");
        assert!(matches!(
            store.save_job(&job).await,
            Err(StorageError::InvalidInput { .. })
        ));
    }

    #[tokio::test]
    async fn access_records_round_trip() {
        let store = MemoryDataStore::new();
        store
            .put_user(User {
                id: "u1".to_string(),
                group_ids: vec!["g1".to_string()],
            })
            .await
            .unwrap();
        store
            .put_group(UserGroup {
                id: "g1".to_string(),
                policy_ids: vec!["p1".to_string()],
            })
            .await
            .unwrap();
        store
            .put_policy(Policy {
                id: "p1".to_string(),
                statements: vec![Statement::new(["read"], ["doc1"])],
            })
            .await
            .unwrap();

        assert_eq!(store.list_users().await.unwrap().len(), 1);
        assert_eq!(store.list_groups().await.unwrap().len(), 1);
        assert_eq!(store.list_policies().await.unwrap().len(), 1);

        // Upsert replaces
        store
            .put_user(User {
                id: "u1".to_string(),
                group_ids: vec![],
            })
            .await
            .unwrap();
        let users = store.list_users().await.unwrap();
        assert!(users[0].group_ids.is_empty());
    }
}
