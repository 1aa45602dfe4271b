//! # cartwright-core: Pure Cart Logic
//!
//! This crate holds the stock ceiling rule that every cart mutation goes
//! through, as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Cartwright Architecture                          │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Storefront (browser)                         │   │
//! │  │      product page ──► "Add to cart" ──► cart badge / drawer     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ JSON over HTTP                         │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 cartwright-api (axum routes)                    │   │
//! │  │      /api/cart/add, /api/cart/remove, /api/cart/clear           │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ cartwright-core (THIS CRATE) ★                  │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │   cart    │  │ validation│  │   │
//! │  │   │  Product  │  │   Money   │  │   Cart    │  │ quantity  │  │   │
//! │  │   │  CartLine │  │           │  │ check_add │  │ product id│  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                  cartwright-db (SQLite)                         │   │
//! │  │            products, cart_lines, migrations                     │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, CartLine, StockShortfall)
//! - [`cart`] - The session cart and its stock ceiling rule
//! - [`money`] - Integer money for cart subtotals
//! - [`error`] - Domain error types
//! - [`validation`] - Parsing and validation of request input
//!
//! ## Example Usage
//!
//! ```rust
//! use chrono::Utc;
//! use cartwright_core::{Cart, CartError, Product};
//!
//! let now = Utc::now();
//! let mug = Product {
//!     id: "mug".to_string(),
//!     name: "Enamel Mug".to_string(),
//!     price_cents: 1800,
//!     quantity_on_hand: 5,
//!     is_active: true,
//!     created_at: now,
//!     updated_at: now,
//! };
//!
//! let mut cart = Cart::new("session-1");
//! cart.apply_add(&mug, 2).unwrap();
//!
//! match cart.apply_add(&mug, 4) {
//!     Err(CartError::StockExceeded(shortfall)) => {
//!         assert_eq!(shortfall.max_additional, 3);
//!         assert_eq!(shortfall.current_in_cart, 2);
//!     }
//!     other => panic!("unexpected: {other:?}"),
//! }
//! assert_eq!(cart.count(), 2);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod error;
pub mod money;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use cart::{AddDecision, Cart, CartSummary};
pub use error::{CartError, CartResult, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum quantity accepted in a single add request.
///
/// ## Business Reason
/// Prevents accidental over-ordering (e.g., typing 1000 instead of 10).
/// Stock is still the binding ceiling below this value.
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Quantity used when an add request omits `quantity`.
pub const DEFAULT_ADD_QUANTITY: i64 = 1;
