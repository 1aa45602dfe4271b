//! # Repository Module
//!
//! Database repository implementations for Cartwright.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Cart service                                                          │
//! │       │                                                                 │
//! │       │  db.products().get_by_id("mug")                                │
//! │       │  db.carts().upsert_line(&session, &line)                       │
//! │       ▼                                                                 │
//! │  ProductRepository               CartRepository                        │
//! │  ├── get_by_id                   ├── load / get_line                   │
//! │  ├── insert / update_stock       ├── upsert_line / delete_line         │
//! │  └── list_active / soft_delete   └── clear / purge_idle                │
//! │       │                                │                               │
//! │       ▼                                ▼                               │
//! │  products table                  cart_lines table                      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`product::ProductRepository`] - Catalog reads and stock adjustments
//! - [`cart::CartRepository`] - Per-session cart lines

pub mod cart;
pub mod product;
