//! The order-placement workflow.
//!
//! Validation and pricing are pure domain calls; the only writes happen in
//! one atomic `place_order` storage call at the end, which is the explicit
//! unit-of-work boundary for checkout.

use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use oms_domain::order::{validate_checkout, OrderLine, PriceBreakdown};
use oms_domain::{DomainError, Order, OrderItem, OrderStatus};
use oms_storage::{DataStore, NewOrder, StockDecrement, StorageError};

use crate::error::{ServiceError, ServiceResult};

/// A checkout request as the HTTP layer hands it over.
#[derive(Debug, Clone)]
pub struct PlaceOrderRequest {
    pub customer_name: String,
    pub customer_email: String,
    pub lines: Vec<OrderLine>,
    pub coupon_code: Option<String>,
}

/// Orchestrates order placement over a [`DataStore`].
#[derive(Debug)]
pub struct CheckoutService<S> {
    storage: Arc<S>,
}

impl<S: DataStore> CheckoutService<S> {
    pub fn new(storage: Arc<S>) -> Self {
        Self { storage }
    }

    /// Places an order: validates the request, resolves each product,
    /// verifies stock, prices the order (subtotal, shipping, coupon
    /// discount), and persists everything in one atomic write.
    pub async fn place_order(&self, request: PlaceOrderRequest) -> ServiceResult<Order> {
        validate_checkout(
            &request.customer_name,
            &request.customer_email,
            &request.lines,
        )?;

        let mut items = Vec::with_capacity(request.lines.len());
        let mut decrements = Vec::with_capacity(request.lines.len());
        for line in &request.lines {
            let product = match self.storage.get_product(line.product_id).await {
                Ok(product) => product,
                Err(StorageError::ProductNotFound { product_id }) => {
                    return Err(DomainError::ProductNotFound { product_id }.into());
                }
                Err(other) => return Err(other.into()),
            };
            if line.quantity > product.stock_quantity {
                return Err(DomainError::InsufficientStock {
                    product_id: product.id,
                    requested: line.quantity,
                    available: product.stock_quantity,
                }
                .into());
            }
            items.push(OrderItem {
                product_id: product.id,
                quantity: line.quantity,
                price: product.price,
            });
            decrements.push(StockDecrement {
                product_id: product.id,
                quantity: line.quantity,
            });
        }

        let pricing = PriceBreakdown::compute(&items, request.coupon_code.as_deref());

        let order = self
            .storage
            .place_order(
                NewOrder {
                    customer_name: request.customer_name,
                    customer_email: request.customer_email,
                    status: OrderStatus::Processing,
                    order_date: Utc::now(),
                    total_amount: pricing.total,
                    items,
                },
                decrements,
            )
            .await
            .map_err(|e| match e {
                // The pre-check above raced with a concurrent placement;
                // report it the same way as the pre-check would have.
                StorageError::InsufficientStock {
                    product_id,
                    requested,
                    available,
                } => ServiceError::Domain(DomainError::InsufficientStock {
                    product_id,
                    requested,
                    available,
                }),
                other => ServiceError::Storage(other),
            })?;

        info!(
            order_id = order.id,
            total = %order.total_amount,
            lines = order.items.len(),
            "order placed"
        );
        Ok(order)
    }
}
