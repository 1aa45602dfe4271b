//! Cart session configuration.
//!
//! Sessions are managed by tower-sessions. The session itself only carries
//! one value, the id of the cart it owns ([`keys::CART_ID`]); cart lines live
//! in the cart store under that id.
//!
//! The cookie expires on inactivity and is re-issued on every cart request,
//! so it lives exactly as long as the shopper keeps using the cart.

use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::{
    cookie::{time::Duration, SameSite},
    session_store::{self, ExpiredDeletion},
    Expiry, MemoryStore, Session, SessionManagerLayer, SessionStore,
};
use tower_sessions_sqlx_store::SqliteStore;
use tracing::debug;
use uuid::Uuid;

use cartwright_core::validation::validate_session_id;
use cartwright_db::{Database, DbError};

use crate::config::{ApiConfig, CartStoreKind};
use crate::error::ApiError;

/// Session cookie name.
pub const SESSION_COOKIE: &str = "cart_session";

/// Session keys.
pub mod keys {
    /// Id of the cart owned by this session.
    pub const CART_ID: &str = "cart_id";
}

// =============================================================================
// Session store
// =============================================================================

/// Where session records are kept. Follows `CARTWRIGHT_CART_STORE`, so a
/// memory cart store never outlives its sessions or the other way round.
#[derive(Clone)]
pub enum SessionBackend {
    Sqlite(SqliteStore),
    Memory(MemoryStore),
}

impl SessionBackend {
    /// Opens the configured store, creating the SQLite session table if needed.
    pub async fn connect(config: &ApiConfig, db: &Database) -> Result<Self, DbError> {
        match config.cart_store {
            CartStoreKind::Sqlite => {
                let store = SqliteStore::new(db.pool().clone());
                store.migrate().await?;
                Ok(SessionBackend::Sqlite(store))
            }
            CartStoreKind::Memory => Ok(SessionBackend::Memory(MemoryStore::default())),
        }
    }

    /// Deletes session records past their expiry.
    pub async fn delete_expired(&self) -> session_store::Result<()> {
        match self {
            SessionBackend::Sqlite(store) => store.delete_expired().await,
            // MemoryStore skips expired records on load and has no sweep of its own
            SessionBackend::Memory(_) => Ok(()),
        }
    }
}

/// Create the session layer for a store.
pub fn create_session_layer<S>(store: S, config: &ApiConfig) -> SessionManagerLayer<S>
where
    S: SessionStore + Clone,
{
    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE)
        .with_expiry(Expiry::OnInactivity(Duration::seconds(
            config.cart_ttl().num_seconds(),
        )))
        .with_always_save(true)
        .with_secure(config.secure_cookies)
        .with_same_site(SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}

// =============================================================================
// Extractor
// =============================================================================

/// The cart a request's operations apply to.
///
/// Extracting it gives the session a cart id if it has none yet, which in
/// turn makes the session layer issue the cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartSession {
    id: String,
}

impl CartSession {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Reads the session's cart id, minting one if absent or malformed.
    pub async fn from_session(session: &Session) -> Result<Self, tower_sessions::session::Error> {
        if let Some(id) = session.get::<String>(keys::CART_ID).await? {
            if validate_session_id(&id).is_ok() {
                return Ok(CartSession { id });
            }
        }

        let id = Uuid::new_v4().to_string();
        session.insert(keys::CART_ID, &id).await?;
        debug!(cart = %id, "Issued new cart");
        Ok(CartSession { id })
    }
}

impl<S> FromRequestParts<S> for CartSession
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Set by SessionManagerLayer
        let session = parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or_else(|| ApiError::internal("Session layer missing"))?;

        Ok(CartSession::from_session(&session).await?)
    }
}
