//! # Cart Handlers
//!
//! JSON endpoints for the storefront's cart widget.
//!
//! ## Response Shapes
//! ```text
//! add ok       { success: true, count, product_id, quantity, subtotal_cents }
//! view/remove/
//! clear ok     { success: true, count, subtotal_cents, lines: [...] }
//! any failure  { success: false, count, error, code,
//!                max_additional?, current_in_cart?, stock_available? }
//! ```
//!
//! `count` is always the session's current unit total, failures included,
//! so the badge never drifts.
//!
//! Bodies are read as raw bytes and parsed here rather than through the
//! `Json` extractor: a bad body must still get the JSON failure shape above.

use axum::{body::Bytes, extract::State, Json};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use cartwright_core::validation::{parse_product_id, parse_quantity};
use cartwright_core::{CartError, CartSummary};

use crate::error::ApiError;
use crate::middleware::CartSession;
use crate::state::AppState;

// =============================================================================
// Responses
// =============================================================================

/// Successful add.
#[derive(Debug, Serialize)]
pub struct AddResponse {
    pub success: bool,
    pub count: i64,
    pub product_id: String,
    /// The line's quantity after the add
    pub quantity: i64,
    pub subtotal_cents: i64,
}

/// Cart contents after a view, remove, or clear.
#[derive(Debug, Serialize)]
pub struct CartResponse {
    pub success: bool,
    #[serde(flatten)]
    pub cart: CartSummary,
}

impl From<CartSummary> for CartResponse {
    fn from(cart: CartSummary) -> Self {
        CartResponse {
            success: true,
            cart,
        }
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// `POST /api/cart/add {product_id, quantity}`
pub async fn add_to_cart(
    State(state): State<AppState>,
    session: CartSession,
    body: Bytes,
) -> Result<Json<AddResponse>, ApiError> {
    debug!(session = %session.id(), "add_to_cart");

    let result = async {
        let body = parse_body(&body)?;
        let product_id = parse_product_id(body.get("product_id").unwrap_or(&Value::Null))?;
        let quantity = parse_quantity(body.get("quantity")).map_err(CartError::InvalidQuantity)?;

        let outcome = state.cart().add(session.id(), &product_id, quantity).await?;

        Ok::<_, ApiError>(AddResponse {
            success: true,
            count: outcome.summary.count,
            product_id,
            quantity: outcome.line.quantity,
            subtotal_cents: outcome.summary.subtotal_cents,
        })
    }
    .await;

    match result {
        Ok(response) => Ok(Json(response)),
        Err(err) => Err(with_cart_count(&state, &session, err).await),
    }
}

/// `POST /api/cart/remove {product_id}`
pub async fn remove_from_cart(
    State(state): State<AppState>,
    session: CartSession,
    body: Bytes,
) -> Result<Json<CartResponse>, ApiError> {
    debug!(session = %session.id(), "remove_from_cart");

    let result = async {
        let body = parse_body(&body)?;
        let product_id = parse_product_id(body.get("product_id").unwrap_or(&Value::Null))?;

        Ok::<_, ApiError>(state.cart().remove(session.id(), &product_id).await?)
    }
    .await;

    match result {
        Ok(summary) => Ok(Json(summary.into())),
        Err(err) => Err(with_cart_count(&state, &session, err).await),
    }
}

/// `POST /api/cart/clear`
pub async fn clear_cart(
    State(state): State<AppState>,
    session: CartSession,
) -> Result<Json<CartResponse>, ApiError> {
    debug!(session = %session.id(), "clear_cart");

    match state.cart().clear(session.id()).await {
        Ok(summary) => Ok(Json(summary.into())),
        Err(err) => Err(with_cart_count(&state, &session, err.into()).await),
    }
}

/// `GET /api/cart`
pub async fn view_cart(
    State(state): State<AppState>,
    session: CartSession,
) -> Result<Json<CartResponse>, ApiError> {
    match state.cart().view(session.id()).await {
        Ok(summary) => Ok(Json(summary.into())),
        Err(err) => Err(with_cart_count(&state, &session, err.into()).await),
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Parses a request body as a JSON object. An empty body is an empty object.
fn parse_body(body: &[u8]) -> Result<Map<String, Value>, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Map::new());
    }

    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(ApiError::validation("Request body must be a JSON object")),
        Err(_) => Err(ApiError::validation("Request body is not valid JSON")),
    }
}

/// Fills in the session's current count on a failure.
async fn with_cart_count(state: &AppState, session: &CartSession, err: ApiError) -> ApiError {
    match state.cart().view(session.id()).await {
        Ok(summary) => err.with_count(summary.count),
        Err(view_err) => {
            warn!(session = %session.id(), error = %view_err, "Could not load cart count for error response");
            err
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ApiConfig, CartStoreKind};
    use crate::middleware::SESSION_COOKIE;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use axum::Router;
    use cartwright_core::Product;
    use cartwright_db::{Database, DbConfig};
    use chrono::Utc;
    use tower::ServiceExt;

    async fn app_with(store: CartStoreKind, products: &[(&str, i64)]) -> Router {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        for (id, stock) in products {
            let now = Utc::now();
            db.products()
                .insert(&Product {
                    id: id.to_string(),
                    name: format!("{id} name"),
                    price_cents: 1500,
                    quantity_on_hand: *stock,
                    is_active: true,
                    created_at: now,
                    updated_at: now,
                })
                .await
                .unwrap();
        }

        let config = ApiConfig {
            cart_store: store,
            ..ApiConfig::default()
        };
        crate::router(AppState::new(config, db).await.unwrap())
    }

    async fn app(products: &[(&str, i64)]) -> Router {
        app_with(CartStoreKind::Sqlite, products).await
    }

    /// Sends a request, returning status, JSON body and any new session cookie.
    async fn send(
        app: &Router,
        method: &str,
        uri: &str,
        cookie: Option<&str>,
        body: &str,
    ) -> (StatusCode, Value, Option<String>) {
        let mut request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(cookie) = cookie {
            request = request.header(header::COOKIE, cookie);
        }

        let response = app
            .clone()
            .oneshot(request.body(Body::from(body.to_string())).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let set_cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .map(|v| v.to_str().unwrap().split(';').next().unwrap().to_string());
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        (status, json, set_cookie)
    }

    /// Opens a session and returns its cookie pair.
    async fn session(app: &Router) -> String {
        let (status, _, cookie) = send(app, "GET", "/api/cart", None, "").await;
        assert_eq!(status, StatusCode::OK);
        cookie.expect("new session should set a cookie")
    }

    #[tokio::test]
    async fn test_single_unit_scenario() {
        let app = app(&[("last-one", 1)]).await;
        let cookie = session(&app).await;

        let (status, body, _) = send(
            &app,
            "POST",
            "/api/cart/add",
            Some(&cookie),
            r#"{"product_id": "last-one", "quantity": 1}"#,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["count"], 1);
        assert_eq!(body["quantity"], 1);

        let (status, body, _) = send(
            &app,
            "POST",
            "/api/cart/add",
            Some(&cookie),
            r#"{"product_id": "last-one", "quantity": 1}"#,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["code"], "STOCK_EXCEEDED");
        assert_eq!(body["max_additional"], 0);
        assert_eq!(body["current_in_cart"], 1);
        assert_eq!(body["stock_available"], 1);
        assert_eq!(body["count"], 1);
    }

    #[tokio::test]
    async fn test_partial_headroom_scenario() {
        let app = app(&[("mug", 5)]).await;
        let cookie = session(&app).await;

        let (status, body, _) = send(
            &app,
            "POST",
            "/api/cart/add",
            Some(&cookie),
            r#"{"product_id": "mug", "quantity": 2}"#,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["subtotal_cents"], 3000);

        let (status, body, _) = send(
            &app,
            "POST",
            "/api/cart/add",
            Some(&cookie),
            r#"{"product_id": "mug", "quantity": 4}"#,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["max_additional"], 3);
        assert_eq!(body["current_in_cart"], 2);
        assert_eq!(body["count"], 2);
        assert!(body["error"].as_str().unwrap().contains("Only 3 more"));
    }

    #[tokio::test]
    async fn test_quantity_defaults_to_one_and_accepts_strings() {
        let app = app(&[("mug", 5)]).await;
        let cookie = session(&app).await;

        let (_, body, _) =
            send(&app, "POST", "/api/cart/add", Some(&cookie), r#"{"product_id": "mug"}"#).await;
        assert_eq!(body["quantity"], 1);

        let (_, body, _) = send(
            &app,
            "POST",
            "/api/cart/add",
            Some(&cookie),
            r#"{"product_id": "mug", "quantity": "2"}"#,
        )
        .await;
        assert_eq!(body["quantity"], 3);
    }

    #[tokio::test]
    async fn test_invalid_quantities_rejected() {
        let app = app(&[("mug", 5)]).await;
        let cookie = session(&app).await;

        for quantity in ["0", "-2", "1.5", "true", "\"two\"", "[1]"] {
            let (status, body, _) = send(
                &app,
                "POST",
                "/api/cart/add",
                Some(&cookie),
                &format!(r#"{{"product_id": "mug", "quantity": {quantity}}}"#),
            )
            .await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "quantity {quantity}");
            assert_eq!(body["code"], "INVALID_QUANTITY", "quantity {quantity}");
            assert_eq!(body["count"], 0);
        }
    }

    #[tokio::test]
    async fn test_unknown_product_is_404() {
        let app = app(&[("mug", 5)]).await;
        let cookie = session(&app).await;

        let (status, body, _) = send(
            &app,
            "POST",
            "/api/cart/add",
            Some(&cookie),
            r#"{"product_id": "ghost", "quantity": 1}"#,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "NOT_FOUND");
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_malformed_bodies_get_json_errors() {
        let app = app(&[("mug", 5)]).await;
        let cookie = session(&app).await;

        for body in ["not json", "[1, 2]", "", r#"{"product_id": "bad id!"}"#] {
            let (status, json, _) =
                send(&app, "POST", "/api/cart/add", Some(&cookie), body).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "body {body:?}");
            assert_eq!(json["code"], "VALIDATION_ERROR", "body {body:?}");
        }
    }

    #[tokio::test]
    async fn test_remove_and_clear_are_idempotent() {
        let app = app(&[("mug", 5), ("tee", 5)]).await;
        let cookie = session(&app).await;

        for body in [
            r#"{"product_id": "mug", "quantity": 2}"#,
            r#"{"product_id": "tee", "quantity": 1}"#,
        ] {
            send(&app, "POST", "/api/cart/add", Some(&cookie), body).await;
        }

        for _ in 0..2 {
            let (status, body, _) = send(
                &app,
                "POST",
                "/api/cart/remove",
                Some(&cookie),
                r#"{"product_id": "mug"}"#,
            )
            .await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["count"], 1);
        }

        for _ in 0..2 {
            let (status, body, _) = send(&app, "POST", "/api/cart/clear", Some(&cookie), "").await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["success"], true);
            assert_eq!(body["count"], 0);
            assert_eq!(body["lines"], Value::Array(vec![]));
        }
    }

    #[tokio::test]
    async fn test_sessions_are_separate() {
        let app = app(&[("mug", 5)]).await;
        let alice = session(&app).await;
        let bob = session(&app).await;
        assert_ne!(alice, bob);

        send(
            &app,
            "POST",
            "/api/cart/add",
            Some(&alice),
            r#"{"product_id": "mug", "quantity": 2}"#,
        )
        .await;

        let (_, body, cookie) = send(&app, "GET", "/api/cart", Some(&bob), "").await;
        assert_eq!(body["count"], 0);
        // Known session: same cookie, re-issued with a fresh expiry
        assert_eq!(cookie.as_deref(), Some(bob.as_str()));
    }

    #[tokio::test]
    async fn test_memory_cart_store_serves_the_same_api() {
        let app = app_with(CartStoreKind::Memory, &[("mug", 2)]).await;
        let cookie = session(&app).await;

        let (status, _, _) = send(
            &app,
            "POST",
            "/api/cart/add",
            Some(&cookie),
            r#"{"product_id": "mug", "quantity": 2}"#,
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (_, body, _) = send(&app, "GET", "/api/cart", Some(&cookie), "").await;
        assert_eq!(body["count"], 2);
        assert_eq!(body["lines"][0]["product_id"], "mug");
    }

    #[tokio::test]
    async fn test_set_cookie_names_session() {
        let app = app(&[]).await;
        let cookie = session(&app).await;

        let (name, value) = cookie.split_once('=').unwrap();
        assert_eq!(name, SESSION_COOKIE);
        assert!(!value.is_empty());
    }

    #[tokio::test]
    async fn test_every_cart_request_refreshes_the_cookie() {
        let app = app(&[("mug", 5)]).await;
        let cookie = session(&app).await;

        for (method, uri, body) in [
            ("POST", "/api/cart/add", r#"{"product_id": "mug"}"#),
            ("POST", "/api/cart/add", r#"{"product_id": "mug", "quantity": 99}"#),
            ("POST", "/api/cart/remove", r#"{"product_id": "mug"}"#),
            ("POST", "/api/cart/clear", ""),
            ("GET", "/api/cart", ""),
        ] {
            let (_, _, refreshed) = send(&app, method, uri, Some(&cookie), body).await;
            assert_eq!(refreshed.as_deref(), Some(cookie.as_str()), "{method} {uri} {body}");
        }
    }

    #[tokio::test]
    async fn test_failed_clear_still_reports_count() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let now = Utc::now();
        db.products()
            .insert(&Product {
                id: "mug".to_string(),
                name: "Mug".to_string(),
                price_cents: 1500,
                quantity_on_hand: 5,
                is_active: true,
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();
        let app = crate::router(AppState::new(ApiConfig::default(), db.clone()).await.unwrap());
        let cookie = session(&app).await;

        send(
            &app,
            "POST",
            "/api/cart/add",
            Some(&cookie),
            r#"{"product_id": "mug", "quantity": 2}"#,
        )
        .await;

        sqlx::query(
            "CREATE TRIGGER keep_lines BEFORE DELETE ON cart_lines \
             BEGIN SELECT RAISE(ABORT, 'lines are locked'); END",
        )
        .execute(db.pool())
        .await
        .unwrap();

        let (status, body, _) = send(&app, "POST", "/api/cart/clear", Some(&cookie), "").await;
        assert!(status.is_server_error());
        assert_eq!(body["success"], false);
        assert_eq!(body["count"], 2);
    }
}
