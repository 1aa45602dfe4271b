//! In-process [`CartStore`].
//!
//! `MemoryCartStore` backs `CARTWRIGHT_CART_STORE=memory`. `MemoryCatalog`
//! only exists for tests that need a catalog without a database.

use std::collections::{BTreeMap, HashMap};
#[cfg(test)]
use std::sync::RwLock;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use tracing::debug;

#[cfg(test)]
use cartwright_core::Product;
use cartwright_core::{Cart, CartLine};

#[cfg(test)]
use super::store::Catalog;
use super::store::{CartStore, StoreError, StoreResult};

// =============================================================================
// Catalog
// =============================================================================

/// Catalog held in a map.
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
    products: Arc<RwLock<HashMap<String, Product>>>,
}

#[cfg(test)]
impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a catalog from products, replacing duplicates by id.
    pub fn with_products(products: impl IntoIterator<Item = Product>) -> Self {
        let map = products.into_iter().map(|p| (p.id.clone(), p)).collect();
        MemoryCatalog {
            products: Arc::new(RwLock::new(map)),
        }
    }
}

#[cfg(test)]
impl Catalog for MemoryCatalog {
    async fn get_product(&self, product_id: &str) -> StoreResult<Option<Product>> {
        let products = self.products.read().map_err(|_| StoreError::Poisoned)?;
        Ok(products.get(product_id).cloned())
    }
}

// =============================================================================
// Cart store
// =============================================================================

type SessionLines = BTreeMap<String, CartLine>;

/// Session carts held in process memory. Clones share the same carts.
#[derive(Debug, Clone, Default)]
pub struct MemoryCartStore {
    carts: Arc<Mutex<HashMap<String, SessionLines>>>,
}

impl MemoryCartStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of sessions holding at least one line.
    #[cfg(test)]
    pub fn session_count(&self) -> StoreResult<usize> {
        let carts = self.carts.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(carts.len())
    }
}

impl CartStore for MemoryCartStore {
    async fn load(&self, session_id: &str) -> StoreResult<Cart> {
        let carts = self.carts.lock().map_err(|_| StoreError::Poisoned)?;
        let lines = carts
            .get(session_id)
            .map(|lines| lines.values().cloned().collect::<Vec<_>>())
            .unwrap_or_default();
        Ok(Cart::from_lines(session_id, lines))
    }

    async fn put_line(&self, session_id: &str, line: &CartLine) -> StoreResult<()> {
        let mut carts = self.carts.lock().map_err(|_| StoreError::Poisoned)?;
        let lines = carts.entry(session_id.to_string()).or_default();

        let mut line = line.clone();
        // Same as the SQLite upsert: an existing line keeps its added_at
        if let Some(existing) = lines.get(&line.product_id) {
            line.added_at = existing.added_at;
        }
        lines.insert(line.product_id.clone(), line);
        Ok(())
    }

    async fn delete_line(&self, session_id: &str, product_id: &str) -> StoreResult<bool> {
        let mut carts = self.carts.lock().map_err(|_| StoreError::Poisoned)?;
        let Some(lines) = carts.get_mut(session_id) else {
            return Ok(false);
        };

        let removed = lines.remove(product_id).is_some();
        if lines.is_empty() {
            carts.remove(session_id);
        }
        Ok(removed)
    }

    async fn clear(&self, session_id: &str) -> StoreResult<u64> {
        let mut carts = self.carts.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(carts
            .remove(session_id)
            .map_or(0, |lines| lines.len() as u64))
    }

    async fn touch(&self, session_id: &str) -> StoreResult<()> {
        let mut carts = self.carts.lock().map_err(|_| StoreError::Poisoned)?;
        if let Some(lines) = carts.get_mut(session_id) {
            let now = Utc::now();
            for line in lines.values_mut() {
                line.updated_at = now;
            }
        }
        Ok(())
    }

    async fn purge_idle(&self, cutoff: DateTime<Utc>) -> StoreResult<u64> {
        let mut carts = self.carts.lock().map_err(|_| StoreError::Poisoned)?;
        let mut removed = 0u64;

        carts.retain(|session_id, lines| {
            let last_write = lines.values().map(|line| line.updated_at).max();
            let idle = last_write.map_or(true, |at| at < cutoff);
            if idle {
                debug!(session_id = %session_id, lines = lines.len(), "Purging idle cart");
                removed += lines.len() as u64;
            }
            !idle
        });

        Ok(removed)
    }
}
