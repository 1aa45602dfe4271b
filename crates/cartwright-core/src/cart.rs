//! # Cart
//!
//! The session cart and the stock ceiling rule.
//!
//! ## Add Decision Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  check_add(product, requested)                                          │
//! │       │                                                                 │
//! │       ├── product inactive? ─────────────► ProductNotFound              │
//! │       ├── requested ∉ 1..=999? ──────────► InvalidQuantity              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  current_in_cart = lines[product].quantity (0 if absent)                │
//! │  stock_available = product.quantity_on_hand                             │
//! │       │                                                                 │
//! │       ├── current + requested <= stock ──► AddDecision { new_quantity } │
//! │       │                                                                 │
//! │       └── otherwise ─────────────────────► StockExceeded {              │
//! │                                              max_additional =           │
//! │                                              max(0, stock - current) }  │
//! │                                                                         │
//! │  The cart is never touched by check_add; apply_add commits only after  │
//! │  a successful decision (all-or-nothing, no partial fulfillment).       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CartError, CartResult};
use crate::money::Money;
use crate::types::{CartLine, Product, StockShortfall};
use crate::validation::validate_quantity;

// =============================================================================
// Add Decision
// =============================================================================

/// The outcome of a permitted add: what the line held before and what it
/// should hold after commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddDecision {
    pub product_id: String,
    pub previous_quantity: i64,
    pub new_quantity: i64,
}

// =============================================================================
// Cart
// =============================================================================

/// A session-scoped cart.
///
/// ## Invariants
/// - Lines are unique by `product_id` (adding again increases quantity)
/// - Every line has `quantity > 0`
/// - After any successful `apply_add`, each line's quantity is within the
///   stock ceiling of the product it was checked against
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    session_id: String,
    lines: BTreeMap<String, CartLine>,
    updated_at: DateTime<Utc>,
}

impl Cart {
    /// Creates a new empty cart for a session.
    pub fn new(session_id: impl Into<String>) -> Self {
        Cart {
            session_id: session_id.into(),
            lines: BTreeMap::new(),
            updated_at: Utc::now(),
        }
    }

    /// Rebuilds a cart from persisted lines.
    ///
    /// Lines with a non-positive quantity are dropped rather than carried.
    pub fn from_lines(session_id: impl Into<String>, lines: impl IntoIterator<Item = CartLine>) -> Self {
        let lines: BTreeMap<String, CartLine> = lines
            .into_iter()
            .filter(|line| line.quantity > 0)
            .map(|line| (line.product_id.clone(), line))
            .collect();

        let updated_at = lines
            .values()
            .map(|line| line.updated_at)
            .max()
            .unwrap_or_else(Utc::now);

        Cart {
            session_id: session_id.into(),
            lines,
            updated_at,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// When the cart was last modified.
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Quantity of a product currently in the cart (0 if absent).
    pub fn quantity_of(&self, product_id: &str) -> i64 {
        self.lines.get(product_id).map_or(0, |line| line.quantity)
    }

    pub fn line(&self, product_id: &str) -> Option<&CartLine> {
        self.lines.get(product_id)
    }

    /// Lines ordered by product id.
    pub fn lines(&self) -> impl Iterator<Item = &CartLine> {
        self.lines.values()
    }

    /// Decides whether `requested` more units of `product` fit under its
    /// stock ceiling. Never mutates the cart.
    pub fn check_add(&self, product: &Product, requested: i64) -> CartResult<AddDecision> {
        if !product.is_active {
            return Err(CartError::ProductNotFound(product.id.clone()));
        }

        validate_quantity(requested).map_err(CartError::InvalidQuantity)?;

        let current_in_cart = self.quantity_of(&product.id);
        let stock_available = product.stock_ceiling();

        match current_in_cart.checked_add(requested) {
            Some(total) if total <= stock_available => Ok(AddDecision {
                product_id: product.id.clone(),
                previous_quantity: current_in_cart,
                new_quantity: total,
            }),
            _ => Err(CartError::StockExceeded(StockShortfall::new(
                product.id.clone(),
                requested,
                current_in_cart,
                stock_available,
            ))),
        }
    }

    /// Checks and commits an add. On error the cart is unchanged.
    pub fn apply_add(&mut self, product: &Product, requested: i64) -> CartResult<&CartLine> {
        let decision = self.check_add(product, requested)?;
        Ok(self.write_line(product, decision.new_quantity))
    }

    fn write_line(&mut self, product: &Product, quantity: i64) -> &CartLine {
        let now = Utc::now();
        self.updated_at = now;

        let line = self
            .lines
            .entry(product.id.clone())
            .or_insert_with(|| CartLine::from_product(product, quantity));
        line.name = product.name.clone();
        line.unit_price_cents = product.price_cents;
        line.quantity = quantity;
        line.updated_at = now;
        line
    }

    /// Removes a line. Idempotent: removing an absent line returns `None`.
    pub fn remove(&mut self, product_id: &str) -> Option<CartLine> {
        let removed = self.lines.remove(product_id);
        if removed.is_some() {
            self.updated_at = Utc::now();
        }
        removed
    }

    /// Empties the cart. Idempotent.
    pub fn clear(&mut self) {
        self.lines.clear();
        self.updated_at = Utc::now();
    }

    /// Total units across all lines (the storefront's cart badge).
    pub fn count(&self) -> i64 {
        self.lines
            .values()
            .fold(0i64, |total, line| total.saturating_add(line.quantity))
    }

    /// Number of distinct products.
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn subtotal(&self) -> Money {
        self.lines.values().map(CartLine::line_total).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

// =============================================================================
// Cart Summary
// =============================================================================

/// Cart view returned to the storefront.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CartSummary {
    pub lines: Vec<CartLine>,
    pub count: i64,
    pub subtotal_cents: i64,
}

impl From<&Cart> for CartSummary {
    fn from(cart: &Cart) -> Self {
        CartSummary {
            lines: cart.lines().cloned().collect(),
            count: cart.count(),
            subtotal_cents: cart.subtotal().cents(),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;

    fn test_product(id: &str, stock: i64) -> Product {
        let now = Utc::now();
        Product {
            id: id.to_string(),
            name: format!("Product {id}"),
            price_cents: 1000,
            quantity_on_hand: stock,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_single_unit_stock() {
        let mut cart = Cart::new("s");
        let product = test_product("1", 1);

        assert_eq!(cart.apply_add(&product, 1).unwrap().quantity, 1);
        assert_eq!(cart.count(), 1);

        let err = cart.apply_add(&product, 1).unwrap_err();
        let shortfall = err.shortfall().unwrap();
        assert_eq!(shortfall.max_additional, 0);
        assert_eq!(shortfall.current_in_cart, 1);
        assert_eq!(shortfall.stock_available, 1);
        assert_eq!(cart.count(), 1);
    }

    #[test]
    fn test_partial_headroom() {
        let mut cart = Cart::new("s");
        let product = test_product("1", 5);

        cart.apply_add(&product, 2).unwrap();
        let before = cart.clone();

        let err = cart.apply_add(&product, 4).unwrap_err();
        assert_eq!(
            err,
            CartError::StockExceeded(StockShortfall {
                product_id: "1".to_string(),
                requested: 4,
                current_in_cart: 2,
                stock_available: 5,
                max_additional: 3,
            })
        );
        // Rejection leaves the cart untouched
        assert_eq!(cart, before);

        // Exactly filling the ceiling is allowed
        assert_eq!(cart.apply_add(&product, 3).unwrap().quantity, 5);
    }

    #[test]
    fn test_same_product_accumulates_into_one_line() {
        let mut cart = Cart::new("s");
        let product = test_product("1", 10);

        cart.apply_add(&product, 2).unwrap();
        cart.apply_add(&product, 3).unwrap();

        assert_eq!(cart.line_count(), 1);
        assert_eq!(cart.quantity_of("1"), 5);
        assert_eq!(cart.subtotal().cents(), 5000);
    }

    #[test]
    fn test_out_of_stock_product() {
        let cart = Cart::new("s");
        let err = cart.check_add(&test_product("1", 0), 1).unwrap_err();
        assert_eq!(err.shortfall().unwrap().max_additional, 0);
    }

    #[test]
    fn test_inactive_product_is_not_found() {
        let cart = Cart::new("s");
        let mut product = test_product("gone", 10);
        product.is_active = false;

        assert_eq!(
            cart.check_add(&product, 1),
            Err(CartError::ProductNotFound("gone".to_string()))
        );
    }

    #[test]
    fn test_invalid_quantity_rejected_before_stock() {
        let mut cart = Cart::new("s");
        let product = test_product("1", 10);

        for qty in [0, -3, 1000] {
            assert!(matches!(
                cart.apply_add(&product, qty),
                Err(CartError::InvalidQuantity(_))
            ));
        }
        assert!(matches!(
            cart.apply_add(&product, 0),
            Err(CartError::InvalidQuantity(ValidationError::MustBePositive { .. }))
        ));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_stock_below_cart_after_restock_drop() {
        // Cart was filled, then stock dropped elsewhere (e.g., checkout)
        let mut cart = Cart::new("s");
        cart.apply_add(&test_product("1", 5), 4).unwrap();

        let err = cart.check_add(&test_product("1", 2), 1).unwrap_err();
        let shortfall = err.shortfall().unwrap();
        assert_eq!(shortfall.current_in_cart, 4);
        assert_eq!(shortfall.max_additional, 0);
    }

    #[test]
    fn test_successful_adds_never_exceed_stock() {
        let product = test_product("1", 7);
        let mut cart = Cart::new("s");

        for requested in [1, 3, 2, 4, 1, 1, 5, 1] {
            let before = cart.quantity_of("1");
            match cart.apply_add(&product, requested).map(|line| line.quantity) {
                Ok(quantity) => assert_eq!(quantity, before + requested),
                Err(CartError::StockExceeded(s)) => {
                    assert_eq!(s.max_additional, (7 - before).max(0));
                    assert_eq!(cart.quantity_of("1"), before);
                }
                Err(other) => panic!("unexpected error: {other}"),
            }
            assert!(cart.quantity_of("1") <= product.quantity_on_hand);
        }
        assert_eq!(cart.quantity_of("1"), 7);
    }

    #[test]
    fn test_remove_and_clear_are_idempotent() {
        let mut cart = Cart::new("s");
        assert!(cart.remove("missing").is_none());
        cart.clear();
        assert!(cart.is_empty());

        cart.apply_add(&test_product("1", 3), 1).unwrap();
        cart.apply_add(&test_product("2", 3), 2).unwrap();
        assert!(cart.remove("1").is_some());
        assert!(cart.remove("1").is_none());
        assert_eq!(cart.count(), 2);

        cart.clear();
        cart.clear();
        assert_eq!(cart.count(), 0);
    }

    #[test]
    fn test_re_add_keeps_added_at_and_refreshes_snapshot() {
        let mut cart = Cart::new("s");
        let mut product = test_product("1", 10);
        let added_at = cart.apply_add(&product, 1).unwrap().added_at;

        product.price_cents = 1200;
        let line = cart.apply_add(&product, 1).unwrap();
        assert_eq!(line.added_at, added_at);
        assert_eq!(line.unit_price_cents, 1200);
        assert_eq!(line.quantity, 2);
    }

    #[test]
    fn test_count_saturates() {
        let big = CartLine::from_product(&test_product("1", 10), i64::MAX);
        let other = CartLine::from_product(&test_product("2", 10), i64::MAX - 1);

        let cart = Cart::from_lines("s", vec![big, other]);
        assert_eq!(cart.count(), i64::MAX);
    }

    #[test]
    fn test_from_lines_drops_empty_lines() {
        let product = test_product("1", 10);
        let mut empty = CartLine::from_product(&test_product("2", 10), 1);
        empty.quantity = 0;

        let cart = Cart::from_lines("s", vec![CartLine::from_product(&product, 3), empty]);
        assert_eq!(cart.line_count(), 1);
        assert_eq!(cart.session_id(), "s");
    }

    #[test]
    fn test_summary() {
        let mut cart = Cart::new("s");
        cart.apply_add(&test_product("a", 5), 2).unwrap();
        cart.apply_add(&test_product("b", 5), 1).unwrap();

        let summary = CartSummary::from(&cart);
        assert_eq!(summary.count, 3);
        assert_eq!(summary.subtotal_cents, 3000);
        assert_eq!(summary.lines.len(), 2);
    }
}
