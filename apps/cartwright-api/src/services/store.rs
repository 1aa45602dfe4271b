//! # Storage Seams
//!
//! The cart service talks to two traits rather than to sqlx directly:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  CartValidator<C: Catalog, S: CartStore>                               │
//! │       │                          │                                      │
//! │       ▼                          ▼                                      │
//! │  Catalog                    CartStore                                  │
//! │  ├── ProductRepository      ├── CartBackend::Sqlite(CartRepository)    │
//! │  └── MemoryCatalog (tests)  └── CartBackend::Memory(MemoryCartStore)   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The catalog is read-only from the cart's point of view.

use std::future::Future;

use chrono::{DateTime, Utc};
use thiserror::Error;

use cartwright_core::{Cart, CartLine, Product};
use cartwright_db::{CartRepository, DbError, ProductRepository};

use super::memory::MemoryCartStore;

// =============================================================================
// Errors
// =============================================================================

/// Storage failures. Always surfaced to clients as a generic 500.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Database(#[from] DbError),

    /// A thread panicked while holding an in-memory store lock.
    #[error("In-memory store lock poisoned")]
    Poisoned,
}

pub type StoreResult<T> = Result<T, StoreError>;

// =============================================================================
// Traits
// =============================================================================

/// Product lookup.
pub trait Catalog: Send + Sync + 'static {
    /// Returns the product, active or not. `None` if the id is unknown.
    fn get_product(&self, product_id: &str) -> impl Future<Output = StoreResult<Option<Product>>> + Send;
}

/// Session-keyed cart line storage.
///
/// Implementations do no validation of their own; the validator decides
/// what gets written.
pub trait CartStore: Send + Sync + 'static {
    /// Loads a session's cart. An unknown session is an empty cart.
    fn load(&self, session_id: &str) -> impl Future<Output = StoreResult<Cart>> + Send;

    /// Inserts or replaces one line.
    fn put_line(&self, session_id: &str, line: &CartLine) -> impl Future<Output = StoreResult<()>> + Send;

    /// Deletes one line. Returns whether it existed.
    fn delete_line(&self, session_id: &str, product_id: &str) -> impl Future<Output = StoreResult<bool>> + Send;

    /// Deletes every line for the session. Returns the number removed.
    fn clear(&self, session_id: &str) -> impl Future<Output = StoreResult<u64>> + Send;

    /// Marks the session's cart as in use now. A no-op for an empty cart.
    fn touch(&self, session_id: &str) -> impl Future<Output = StoreResult<()>> + Send;

    /// Deletes carts not written or touched since `cutoff`. Returns lines removed.
    fn purge_idle(&self, cutoff: DateTime<Utc>) -> impl Future<Output = StoreResult<u64>> + Send;
}

// =============================================================================
// SQLite
// =============================================================================

impl Catalog for ProductRepository {
    async fn get_product(&self, product_id: &str) -> StoreResult<Option<Product>> {
        Ok(self.get_by_id(product_id).await?)
    }
}

impl CartStore for CartRepository {
    async fn load(&self, session_id: &str) -> StoreResult<Cart> {
        let lines = CartRepository::load(self, session_id).await?;
        Ok(Cart::from_lines(session_id, lines))
    }

    async fn put_line(&self, session_id: &str, line: &CartLine) -> StoreResult<()> {
        Ok(self.upsert_line(session_id, line).await?)
    }

    async fn delete_line(&self, session_id: &str, product_id: &str) -> StoreResult<bool> {
        Ok(CartRepository::delete_line(self, session_id, product_id).await?)
    }

    async fn clear(&self, session_id: &str) -> StoreResult<u64> {
        Ok(CartRepository::clear(self, session_id).await?)
    }

    async fn touch(&self, session_id: &str) -> StoreResult<()> {
        CartRepository::touch(self, session_id, Utc::now()).await?;
        Ok(())
    }

    async fn purge_idle(&self, cutoff: DateTime<Utc>) -> StoreResult<u64> {
        Ok(CartRepository::purge_idle(self, cutoff).await?)
    }
}

// =============================================================================
// Backend selection
// =============================================================================

/// Cart store chosen at startup from `CARTWRIGHT_CART_STORE`.
#[derive(Debug, Clone)]
pub enum CartBackend {
    Sqlite(CartRepository),
    Memory(MemoryCartStore),
}

impl CartStore for CartBackend {
    async fn load(&self, session_id: &str) -> StoreResult<Cart> {
        match self {
            CartBackend::Sqlite(repo) => CartStore::load(repo, session_id).await,
            CartBackend::Memory(store) => store.load(session_id).await,
        }
    }

    async fn put_line(&self, session_id: &str, line: &CartLine) -> StoreResult<()> {
        match self {
            CartBackend::Sqlite(repo) => repo.put_line(session_id, line).await,
            CartBackend::Memory(store) => store.put_line(session_id, line).await,
        }
    }

    async fn delete_line(&self, session_id: &str, product_id: &str) -> StoreResult<bool> {
        match self {
            CartBackend::Sqlite(repo) => CartStore::delete_line(repo, session_id, product_id).await,
            CartBackend::Memory(store) => store.delete_line(session_id, product_id).await,
        }
    }

    async fn clear(&self, session_id: &str) -> StoreResult<u64> {
        match self {
            CartBackend::Sqlite(repo) => CartStore::clear(repo, session_id).await,
            CartBackend::Memory(store) => store.clear(session_id).await,
        }
    }

    async fn touch(&self, session_id: &str) -> StoreResult<()> {
        match self {
            CartBackend::Sqlite(repo) => CartStore::touch(repo, session_id).await,
            CartBackend::Memory(store) => store.touch(session_id).await,
        }
    }

    async fn purge_idle(&self, cutoff: DateTime<Utc>) -> StoreResult<u64> {
        match self {
            CartBackend::Sqlite(repo) => CartStore::purge_idle(repo, cutoff).await,
            CartBackend::Memory(store) => store.purge_idle(cutoff).await,
        }
    }
}
