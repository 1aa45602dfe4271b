//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                 - Liveness
//! GET  /health/ready           - Readiness (database reachable)
//!
//! # Cart (JSON, cart_session cookie)
//! GET  /api/cart               - Cart contents
//! POST /api/cart/add           - Add {product_id, quantity}
//! POST /api/cart/remove        - Remove {product_id}
//! POST /api/cart/clear         - Empty the cart
//! ```

pub mod cart;
pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::state::AppState;

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::view_cart))
        .route("/add", post(cart::add_to_cart))
        .route("/remove", post(cart::remove_from_cart))
        .route("/clear", post(cart::clear_cart))
}

/// Create the health routes router.
pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(health::health))
        .route("/ready", get(health::readiness))
}
