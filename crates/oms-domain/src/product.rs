//! Products and stock rules.

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// VAT rate applied by [`Product::change_price`] when tax is included.
const VAT_RATE: Decimal = dec!(0.10);

/// A catalog product with a mutable stock level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: Decimal,
    pub stock_quantity: i32,
    #[serde(default)]
    pub category: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Validates the invariants a product must satisfy before it is stored:
    /// a non-blank name and a positive price.
    pub fn validate(&self) -> DomainResult<()> {
        if self.name.trim().is_empty() {
            return Err(DomainError::Validation {
                message: "product name is required".to_string(),
            });
        }
        if self.price <= Decimal::ZERO {
            return Err(DomainError::InvalidPrice { price: self.price });
        }
        Ok(())
    }

    /// Whether any stock remains.
    pub fn is_in_stock(&self) -> bool {
        self.stock_quantity > 0
    }

    /// Removes `quantity` units from stock.
    ///
    /// Fails when the quantity is not positive or exceeds the available
    /// stock; the stock level is left untouched on failure.
    pub fn decrease_stock(&mut self, quantity: i32) -> DomainResult<()> {
        if quantity <= 0 {
            return Err(DomainError::InvalidQuantity { quantity });
        }
        if quantity > self.stock_quantity {
            return Err(DomainError::InsufficientStock {
                product_id: self.id,
                requested: quantity,
                available: self.stock_quantity,
            });
        }
        self.stock_quantity -= quantity;
        Ok(())
    }

    /// Adds `quantity` units to stock. Fails when the quantity is not positive.
    pub fn increase_stock(&mut self, quantity: i32) -> DomainResult<()> {
        if quantity <= 0 {
            return Err(DomainError::InvalidQuantity { quantity });
        }
        self.stock_quantity += quantity;
        Ok(())
    }

    /// Adjusts the price by `percentage` percent, optionally adding VAT,
    /// rounding half-up to two decimal places.
    pub fn change_price(&mut self, percentage: Decimal, include_tax: bool) {
        let rate = percentage / dec!(100);
        let mut changed = self.price * (Decimal::ONE + rate);
        if include_tax {
            changed *= Decimal::ONE + VAT_RATE;
        }
        self.price = changed.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    }
}
