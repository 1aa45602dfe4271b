//! # Domain Types
//!
//! Core domain types used throughout Cartwright.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌──────────────────┐   ┌──────────────────┐   ┌──────────────────┐    │
//! │  │    Product       │   │    CartLine      │   │  StockShortfall  │    │
//! │  │  ──────────────  │   │  ──────────────  │   │  ──────────────  │    │
//! │  │  id              │   │  product_id (FK) │   │  current_in_cart │    │
//! │  │  name            │   │  quantity (> 0)  │   │  stock_available │    │
//! │  │  price_cents     │   │  name snapshot   │   │  max_additional  │    │
//! │  │  quantity_on_hand│   │  price snapshot  │   │  requested       │    │
//! │  └──────────────────┘   └──────────────────┘   └──────────────────┘    │
//! │                                                                         │
//! │  Product is owned by the catalog and read-only from the cart's view.   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Product
// =============================================================================

/// A product in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    /// Catalog identifier.
    pub id: String,

    /// Display name shown in the cart.
    pub name: String,

    /// Unit price in cents (smallest currency unit).
    pub price_cents: i64,

    /// Units in stock. This is the stock ceiling for every cart.
    pub quantity_on_hand: i64,

    /// Whether the product is sellable (soft delete).
    pub is_active: bool,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the price as a Money type.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Maximum quantity of this product any single cart may hold.
    ///
    /// Stock is never negative in a healthy catalog, but a bad import
    /// shouldn't let a cart treat negative stock as headroom.
    #[inline]
    pub fn stock_ceiling(&self) -> i64 {
        self.quantity_on_hand.max(0)
    }
}

// =============================================================================
// Cart Line
// =============================================================================

/// One product's entry in a session cart.
///
/// A line only exists while `quantity > 0`; removing the last unit removes
/// the line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct CartLine {
    pub product_id: String,

    /// Product name when the line was last written.
    pub name: String,

    /// Unit price in cents when the line was last written.
    pub unit_price_cents: i64,

    pub quantity: i64,

    #[ts(as = "String")]
    pub added_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl CartLine {
    /// Creates a line from a product snapshot.
    pub fn from_product(product: &Product, quantity: i64) -> Self {
        let now = Utc::now();
        CartLine {
            product_id: product.id.clone(),
            name: product.name.clone(),
            unit_price_cents: product.price_cents,
            quantity,
            added_at: now,
            updated_at: now,
        }
    }

    /// Line total (unit price × quantity).
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.unit_price_cents) * self.quantity
    }
}

// =============================================================================
// Stock Shortfall
// =============================================================================

/// Why an add was refused, with enough data for the client to adjust.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StockShortfall {
    pub product_id: String,
    pub requested: i64,
    pub current_in_cart: i64,
    pub stock_available: i64,
    /// `max(0, stock_available - current_in_cart)`
    pub max_additional: i64,
}

impl StockShortfall {
    /// Builds a shortfall report, deriving `max_additional`.
    pub fn new(
        product_id: impl Into<String>,
        requested: i64,
        current_in_cart: i64,
        stock_available: i64,
    ) -> Self {
        StockShortfall {
            product_id: product_id.into(),
            requested,
            current_in_cart,
            stock_available,
            max_additional: stock_available.saturating_sub(current_in_cart).max(0),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn product(stock: i64) -> Product {
        let now = Utc::now();
        Product {
            id: "tee".to_string(),
            name: "Logo Tee".to_string(),
            price_cents: 2500,
            quantity_on_hand: stock,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_stock_ceiling_clamps_negative() {
        assert_eq!(product(7).stock_ceiling(), 7);
        assert_eq!(product(0).stock_ceiling(), 0);
        assert_eq!(product(-3).stock_ceiling(), 0);
    }

    #[test]
    fn test_line_snapshot_and_total() {
        let line = CartLine::from_product(&product(10), 3);
        assert_eq!(line.name, "Logo Tee");
        assert_eq!(line.unit_price_cents, 2500);
        assert_eq!(line.line_total().cents(), 7500);
    }

    #[test]
    fn test_shortfall_max_additional() {
        assert_eq!(StockShortfall::new("tee", 4, 2, 5).max_additional, 3);
        assert_eq!(StockShortfall::new("tee", 1, 1, 1).max_additional, 0);
        // Stock dropped below what the cart already holds
        assert_eq!(StockShortfall::new("tee", 1, 4, 2).max_additional, 0);
    }
}
