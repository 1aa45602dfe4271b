//! # Cartwright API
//!
//! HTTP cart service: session carts that can never hold more of a product
//! than the catalog has in stock.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Cartwright API                                   │
//! │                                                                         │
//! │  Storefront ──► TraceLayer ──► SessionManagerLayer ──► routes::cart    │
//! │                                                          │              │
//! │                                                          ▼              │
//! │                                               CartValidator             │
//! │                                          (cartwright-core rules)        │
//! │                                                │            │           │
//! │                                                ▼            ▼           │
//! │                                         ProductRepository  CartBackend  │
//! │                                                │     (sqlite | memory)  │
//! │                                                ▼            │           │
//! │                                             SQLite ◄────────┘           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;

use axum::Router;
use tower_http::trace::TraceLayer;

use crate::middleware::{create_session_layer, SessionBackend};
use crate::state::AppState;

/// Builds the full application router.
pub fn router(state: AppState) -> Router {
    let config = state.config();
    let cart = match state.sessions() {
        SessionBackend::Sqlite(store) => {
            routes::cart_routes().route_layer(create_session_layer(store.clone(), config))
        }
        SessionBackend::Memory(store) => {
            routes::cart_routes().route_layer(create_session_layer(store.clone(), config))
        }
    };

    Router::new()
        .nest("/health", routes::health_routes())
        .nest("/api/cart", cart)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ApiConfig;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use cartwright_db::{Database, DbConfig};
    use tower::ServiceExt;

    async fn get(app: Router, uri: &str) -> StatusCode {
        app.oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
            .status()
    }

    #[tokio::test]
    async fn test_health_endpoints() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let app = router(AppState::new(ApiConfig::default(), db.clone()).await.unwrap());

        assert_eq!(get(app.clone(), "/health").await, StatusCode::OK);
        assert_eq!(get(app.clone(), "/health/ready").await, StatusCode::OK);

        db.close().await;
        assert_eq!(
            get(app, "/health/ready").await,
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[tokio::test]
    async fn test_health_does_not_issue_sessions() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let app = router(AppState::new(ApiConfig::default(), db).await.unwrap());

        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert!(response.headers().get("set-cookie").is_none());
    }
}
