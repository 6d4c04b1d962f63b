//! Orders, order items, and the pricing rules of the checkout workflow.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Subtotal at or above which shipping is free.
const FREE_SHIPPING_THRESHOLD: Decimal = dec!(100.00);

/// Flat shipping fee below the free-shipping threshold.
const SHIPPING_FEE: Decimal = dec!(5.00);

/// Flat discount granted by `SALE*` coupon codes.
const SALE_DISCOUNT: Decimal = dec!(10.00);

/// Coupon codes starting with this prefix grant [`SALE_DISCOUNT`].
const SALE_COUPON_PREFIX: &str = "SALE";

/// Lifecycle state of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// Stable string form, used for storage columns.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "processing" => Ok(OrderStatus::Processing),
            "shipped" => Ok(OrderStatus::Shipped),
            "delivered" => Ok(OrderStatus::Delivered),
            "cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(DomainError::Validation {
                message: format!("unknown order status: {other}"),
            }),
        }
    }
}

/// A line on a stored order, capturing the unit price at placement time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: i64,
    pub quantity: i32,
    pub price: Decimal,
}

impl OrderItem {
    /// Line total: unit price × quantity.
    pub fn line_total(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }
}

/// A customer order with its items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub customer_name: String,
    pub customer_email: String,
    pub status: OrderStatus,
    pub order_date: DateTime<Utc>,
    pub total_amount: Decimal,
    #[serde(default)]
    pub items: Vec<OrderItem>,
}

/// A requested order line before any product has been resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: i64,
    pub quantity: i32,
}

/// Validates the customer-supplied parts of a checkout request: non-blank
/// customer fields, at least one line, and positive quantities.
pub fn validate_checkout(
    customer_name: &str,
    customer_email: &str,
    lines: &[OrderLine],
) -> DomainResult<()> {
    if customer_name.trim().is_empty() || customer_email.trim().is_empty() {
        return Err(DomainError::Validation {
            message: "customer name and email are required".to_string(),
        });
    }
    if lines.is_empty() {
        return Err(DomainError::Validation {
            message: "order must contain at least one line".to_string(),
        });
    }
    for line in lines {
        if line.quantity <= 0 {
            return Err(DomainError::InvalidQuantity {
                quantity: line.quantity,
            });
        }
    }
    Ok(())
}

/// The priced parts of a checkout: subtotal, shipping, discount, and total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PriceBreakdown {
    pub subtotal: Decimal,
    pub shipping: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
}

impl PriceBreakdown {
    /// Prices an order from its item lines and an optional coupon code.
    ///
    /// Shipping is free at or above 100.00, otherwise a flat 5.00. Coupon
    /// codes starting with `SALE` take a flat 10.00 off. The total can go
    /// negative for a small discounted order; callers decide whether to
    /// reject that.
    pub fn compute(items: &[OrderItem], coupon_code: Option<&str>) -> Self {
        let subtotal: Decimal = items.iter().map(OrderItem::line_total).sum();
        let shipping = if subtotal >= FREE_SHIPPING_THRESHOLD {
            Decimal::ZERO
        } else {
            SHIPPING_FEE
        };
        let discount = match coupon_code {
            Some(code) if code.starts_with(SALE_COUPON_PREFIX) => SALE_DISCOUNT,
            _ => Decimal::ZERO,
        };
        Self {
            subtotal,
            shipping,
            discount,
            total: subtotal + shipping - discount,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(price: Decimal, quantity: i32) -> OrderItem {
        OrderItem {
            product_id: 1,
            quantity,
            price,
        }
    }

    #[test]
    fn small_order_pays_flat_shipping() {
        let pricing = PriceBreakdown::compute(&[item(dec!(20.00), 2)], None);
        assert_eq!(pricing.subtotal, dec!(40.00));
        assert_eq!(pricing.shipping, dec!(5.00));
        assert_eq!(pricing.discount, dec!(0.00));
        assert_eq!(pricing.total, dec!(45.00));
    }

    #[test]
    fn subtotal_at_threshold_ships_free() {
        let pricing = PriceBreakdown::compute(&[item(dec!(50.00), 2)], None);
        assert_eq!(pricing.shipping, Decimal::ZERO);
        assert_eq!(pricing.total, dec!(100.00));
    }

    #[test]
    fn sale_coupon_takes_flat_discount() {
        let pricing = PriceBreakdown::compute(&[item(dec!(60.00), 2)], Some("SALE2024"));
        assert_eq!(pricing.subtotal, dec!(120.00));
        assert_eq!(pricing.shipping, Decimal::ZERO);
        assert_eq!(pricing.discount, dec!(10.00));
        assert_eq!(pricing.total, dec!(110.00));
    }

    #[test]
    fn non_sale_coupon_is_ignored() {
        let pricing = PriceBreakdown::compute(&[item(dec!(10.00), 1)], Some("WELCOME"));
        assert_eq!(pricing.discount, Decimal::ZERO);
        assert_eq!(pricing.total, dec!(15.00));
    }

    #[test]
    fn multiple_lines_accumulate_subtotal() {
        let items = [item(dec!(19.99), 3), item(dec!(0.50), 4)];
        let pricing = PriceBreakdown::compute(&items, None);
        assert_eq!(pricing.subtotal, dec!(61.97));
        assert_eq!(pricing.total, dec!(66.97));
    }

    #[test]
    fn validate_checkout_rejects_blank_customer() {
        let lines = vec![OrderLine {
            product_id: 1,
            quantity: 1,
        }];
        assert!(validate_checkout("", "a@b.com", &lines).is_err());
        assert!(validate_checkout("Alice", "  ", &lines).is_err());
        assert!(validate_checkout("Alice", "a@b.com", &lines).is_ok());
    }

    #[test]
    fn validate_checkout_rejects_empty_or_non_positive_lines() {
        assert!(validate_checkout("Alice", "a@b.com", &[]).is_err());

        let lines = vec![OrderLine {
            product_id: 1,
            quantity: 0,
        }];
        let err = validate_checkout("Alice", "a@b.com", &lines).unwrap_err();
        assert!(matches!(err, DomainError::InvalidQuantity { quantity: 0 }));
    }

    #[test]
    fn order_status_round_trips_through_storage_form() {
        for status in [
            OrderStatus::Pending,
            OrderStatus::Processing,
            OrderStatus::Shipped,
            OrderStatus::Delivered,
            OrderStatus::Cancelled,
        ] {
            assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), status);
        }
        assert!("unknown".parse::<OrderStatus>().is_err());
    }
}
