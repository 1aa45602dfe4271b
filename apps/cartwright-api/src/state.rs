//! Application state shared across handlers.

use std::sync::Arc;

use cartwright_db::{Database, DbError, ProductRepository};

use crate::config::{ApiConfig, CartStoreKind};
use crate::middleware::SessionBackend;
use crate::services::{CartBackend, CartValidator, MemoryCartStore};

/// The validator as wired in production.
pub type ApiCartValidator = CartValidator<ProductRepository, CartBackend>;

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ApiConfig,
    db: Database,
    cart: Arc<ApiCartValidator>,
    sessions: SessionBackend,
}

impl AppState {
    /// Wires the validator to the catalog in `db` and the configured cart
    /// and session stores.
    pub async fn new(config: ApiConfig, db: Database) -> Result<Self, DbError> {
        let store = match config.cart_store {
            CartStoreKind::Sqlite => CartBackend::Sqlite(db.carts()),
            CartStoreKind::Memory => CartBackend::Memory(MemoryCartStore::new()),
        };
        let cart = Arc::new(CartValidator::new(db.products(), store));
        let sessions = SessionBackend::connect(&config, &db).await?;

        Ok(AppState {
            inner: Arc::new(AppStateInner {
                config,
                db,
                cart,
                sessions,
            }),
        })
    }

    pub fn config(&self) -> &ApiConfig {
        &self.inner.config
    }

    pub fn db(&self) -> &Database {
        &self.inner.db
    }

    pub fn cart(&self) -> &ApiCartValidator {
        &self.inner.cart
    }

    /// Shared handle for background tasks.
    pub fn cart_handle(&self) -> Arc<ApiCartValidator> {
        Arc::clone(&self.inner.cart)
    }

    pub fn sessions(&self) -> &SessionBackend {
        &self.inner.sessions
    }
}
