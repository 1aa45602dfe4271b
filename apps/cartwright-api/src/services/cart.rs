//! # Cart Validator
//!
//! Every cart mutation goes through here.
//!
//! ## Add Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  add(session, product_id, qty)                                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  lock session ─── other requests for this session wait here            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌──────────────────── attempt 1..=3 ──────────────────────┐           │
//! │  │  load cart, get_product                                  │           │
//! │  │  Cart::apply_add ──── StockExceeded / NotFound ─────────────► Err   │
//! │  │       │                                                  │           │
//! │  │       ▼                                                  │           │
//! │  │  put_line(new quantity)                                  │           │
//! │  │       │                                                  │           │
//! │  │       ▼                                                  │           │
//! │  │  get_product again                                       │           │
//! │  │  still fits? ──── yes ──────────────────────────────────────► Ok    │
//! │  │       │ no                                               │           │
//! │  │       ▼                                                  │           │
//! │  │  put back the previous line, go round again              │           │
//! │  │  (a failed re-read also puts it back, then errors)       │           │
//! │  └──────────────────────────────────────────────────────────┘           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Contention (409)                                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The session lock stops two requests from the same cart reading the same
//! `current_in_cart`. The re-read after the write catches stock that moved
//! underneath us (another order shipping, an operator adjustment), which the
//! session lock can't see.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, Weak};

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::{debug, error, warn};

use cartwright_core::validation::validate_quantity;
use cartwright_core::{CartError, CartLine, CartSummary};

use super::store::{CartStore, Catalog, StoreError};

/// How many times an add is re-evaluated when stock changes mid-commit.
pub const MAX_COMMIT_ATTEMPTS: u32 = 3;

// =============================================================================
// Errors
// =============================================================================

#[derive(Debug, Error)]
pub enum CartServiceError {
    #[error(transparent)]
    Cart(#[from] CartError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// Stock kept changing between check and commit.
    #[error("Stock for {product_id} changed while adding, gave up after {attempts} attempts")]
    Contention { product_id: String, attempts: u32 },
}

pub type ServiceResult<T> = Result<T, CartServiceError>;

// =============================================================================
// Session locks
// =============================================================================

/// One async mutex per active session.
///
/// The registry only holds weak handles, so a session's mutex is freed as
/// soon as nobody holds or waits on it. Dead entries are pruned on acquire.
#[derive(Debug, Default)]
pub struct SessionLocks {
    locks: Mutex<HashMap<String, Weak<AsyncMutex<()>>>>,
}

impl SessionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to `session_id`.
    pub async fn acquire(&self, session_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            // The map is only touched under this guard and never panics
            // mid-update, so a poisoned map is still consistent.
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            locks.retain(|_, weak| weak.strong_count() > 0);

            match locks.get(session_id).and_then(Weak::upgrade) {
                Some(lock) => lock,
                None => {
                    let lock = Arc::new(AsyncMutex::new(()));
                    locks.insert(session_id.to_string(), Arc::downgrade(&lock));
                    lock
                }
            }
        };

        lock.lock_owned().await
    }

    /// Sessions with a live lock (held or awaited).
    pub fn active(&self) -> usize {
        let locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.values().filter(|weak| weak.strong_count() > 0).count()
    }
}

// =============================================================================
// Validator
// =============================================================================

/// Result of a successful add.
#[derive(Debug, Clone)]
pub struct AddOutcome {
    /// The line as committed.
    pub line: CartLine,
    /// The whole cart after the add.
    pub summary: CartSummary,
}

/// Stock-checked cart operations over a catalog and a cart store.
#[derive(Debug)]
pub struct CartValidator<C, S> {
    catalog: C,
    store: S,
    locks: SessionLocks,
}

impl<C: Catalog, S: CartStore> CartValidator<C, S> {
    pub fn new(catalog: C, store: S) -> Self {
        CartValidator {
            catalog,
            store,
            locks: SessionLocks::new(),
        }
    }

    /// Adds `requested` units of a product to a session's cart.
    ///
    /// All-or-nothing: on any error the cart is as it was before the call.
    pub async fn add(&self, session_id: &str, product_id: &str, requested: i64) -> ServiceResult<AddOutcome> {
        validate_quantity(requested).map_err(CartError::InvalidQuantity)?;

        let _guard = self.locks.acquire(session_id).await;

        for attempt in 1..=MAX_COMMIT_ATTEMPTS {
            let mut cart = self.store.load(session_id).await?;
            let product = self
                .catalog
                .get_product(product_id)
                .await?
                .ok_or_else(|| CartError::ProductNotFound(product_id.to_string()))?;

            let previous = cart.line(product_id).cloned();
            let line = match cart.apply_add(&product, requested) {
                Ok(line) => line.clone(),
                Err(err) => {
                    if let Some(shortfall) = err.shortfall() {
                        warn!(
                            session = %session_id,
                            product_id = %product_id,
                            requested,
                            current_in_cart = shortfall.current_in_cart,
                            stock_available = shortfall.stock_available,
                            "Add rejected: insufficient stock"
                        );
                    }
                    return Err(err.into());
                }
            };

            self.store.put_line(session_id, &line).await?;

            // From here on the line is written: every exit but success puts it back.
            let still_fits = match self.catalog.get_product(product_id).await {
                Ok(fresh) => {
                    fresh.is_some_and(|fresh| fresh.is_active && line.quantity <= fresh.stock_ceiling())
                }
                Err(err) => {
                    self.roll_back(session_id, product_id, previous).await?;
                    return Err(err.into());
                }
            };

            if still_fits {
                debug!(
                    session = %session_id,
                    product_id = %product_id,
                    quantity = line.quantity,
                    attempt,
                    "Added to cart"
                );
                return Ok(AddOutcome {
                    line,
                    summary: CartSummary::from(&cart),
                });
            }

            warn!(
                session = %session_id,
                product_id = %product_id,
                attempt,
                "Stock changed during commit, rolling back line"
            );
            self.roll_back(session_id, product_id, previous).await?;
        }

        Err(CartServiceError::Contention {
            product_id: product_id.to_string(),
            attempts: MAX_COMMIT_ATTEMPTS,
        })
    }

    /// Removes a product's line. Idempotent.
    pub async fn remove(&self, session_id: &str, product_id: &str) -> ServiceResult<CartSummary> {
        let _guard = self.locks.acquire(session_id).await;

        let existed = self.store.delete_line(session_id, product_id).await?;
        debug!(session = %session_id, product_id = %product_id, existed, "Removed from cart");
        self.store.touch(session_id).await?;

        let cart = self.store.load(session_id).await?;
        Ok(CartSummary::from(&cart))
    }

    /// Empties the cart. Idempotent.
    pub async fn clear(&self, session_id: &str) -> ServiceResult<CartSummary> {
        let _guard = self.locks.acquire(session_id).await;

        let removed = self.store.clear(session_id).await?;
        debug!(session = %session_id, removed, "Cart cleared");

        let cart = self.store.load(session_id).await?;
        Ok(CartSummary::from(&cart))
    }

    /// Current cart contents. An unknown session is an empty cart.
    ///
    /// Lines are left as they are; only their idle clock is reset.
    pub async fn view(&self, session_id: &str) -> ServiceResult<CartSummary> {
        self.store.touch(session_id).await?;
        let cart = self.store.load(session_id).await?;
        Ok(CartSummary::from(&cart))
    }

    /// Drops carts not used since `cutoff`. Returns lines removed.
    pub async fn purge_idle(&self, cutoff: DateTime<Utc>) -> ServiceResult<u64> {
        Ok(self.store.purge_idle(cutoff).await?)
    }

    /// Sessions currently being worked on.
    pub fn active_sessions(&self) -> usize {
        self.locks.active()
    }

    /// Puts a line back the way it was before this add wrote it.
    ///
    /// The write is retried so a single store hiccup can't leave an
    /// unchecked quantity behind; the last failure is returned.
    async fn roll_back(&self, session_id: &str, product_id: &str, previous: Option<CartLine>) -> ServiceResult<()> {
        let mut attempt = 1;
        loop {
            let result = match &previous {
                Some(line) => self.store.put_line(session_id, line).await,
                None => self.store.delete_line(session_id, product_id).await.map(|_| ()),
            };

            match result {
                Ok(()) => return Ok(()),
                Err(err) if attempt < MAX_COMMIT_ATTEMPTS => {
                    warn!(session = %session_id, product_id = %product_id, attempt, error = %err, "Roll back failed, retrying");
                    attempt += 1;
                }
                Err(err) => {
                    error!(session = %session_id, product_id = %product_id, error = %err, "Could not roll back cart line");
                    return Err(err.into());
                }
            }
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
