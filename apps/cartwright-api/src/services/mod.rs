//! # Services
//!
//! Cart orchestration between the HTTP handlers and storage.
//!
//! - [`store`] - `Catalog` / `CartStore` seams and their SQLite impls
//! - [`memory`] - In-process cart store (and a test-only catalog)
//! - [`cart`] - `CartValidator`: locking, stock checks, commit-time re-check
//! - [`sweeper`] - Background removal of idle carts

pub mod cart;
pub mod memory;
pub mod store;
pub mod sweeper;

pub use cart::{AddOutcome, CartServiceError, CartValidator, MAX_COMMIT_ATTEMPTS};
pub use memory::MemoryCartStore;
pub use store::{CartBackend, CartStore, Catalog, StoreError, StoreResult};
