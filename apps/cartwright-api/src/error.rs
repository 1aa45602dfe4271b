//! # API Error Type
//!
//! Unified error type for the cart HTTP handlers.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Cartwright                             │
//! │                                                                         │
//! │  Storefront                  Rust Backend                               │
//! │  ──────────                  ────────────                               │
//! │                                                                         │
//! │  POST /api/cart/add                                                    │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  Handler: Result<Json<T>, ApiError>                              │  │
//! │  │         │                                                        │  │
//! │  │  Bad body?        ── ValidationError ──────────┐                 │  │
//! │  │  Unknown product? ── CartError::ProductNotFound ┤                │  │
//! │  │  Over stock?      ── CartError::StockExceeded ──┼──► ApiError ──►│  │
//! │  │  Stock churn?     ── Contention ────────────────┤                │  │
//! │  │  SQLite down?     ── StoreError (logged) ───────┘                │  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │                                                                         │
//! │  ◄──── { "success": false, "error": "...", "code": "...", "count": 2,  │
//! │          "max_additional": 3, "current_in_cart": 2,                    │
//! │          "stock_available": 5 }                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use cartwright_core::{CartError, StockShortfall, ValidationError};

use crate::services::{CartServiceError, StoreError};

/// API error returned from cart handlers.
#[derive(Debug, Clone)]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,

    /// Stock details, for `StockExceeded` only
    pub shortfall: Option<StockShortfall>,

    /// Units in the caller's cart, so the badge stays right on failures
    pub count: i64,
}

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Product unknown or inactive (404)
    NotFound,

    /// Quantity missing the positive-integer rules (400)
    InvalidQuantity,

    /// Other malformed input (400)
    ValidationError,

    /// Add would exceed stock (400)
    StockExceeded,

    /// Stock kept moving during commit (409)
    Contention,

    /// Database operation failed (500)
    DatabaseError,

    /// Internal server error (500)
    Internal,
}

impl ErrorCode {
    pub fn status(self) -> StatusCode {
        match self {
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::InvalidQuantity
            | ErrorCode::ValidationError
            | ErrorCode::StockExceeded => StatusCode::BAD_REQUEST,
            ErrorCode::Contention => StatusCode::CONFLICT,
            ErrorCode::DatabaseError | ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
            shortfall: None,
            count: 0,
        }
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }

    /// Sets the cart count reported alongside the error.
    pub fn with_count(mut self, count: i64) -> Self {
        self.count = count;
        self
    }

    pub fn status(&self) -> StatusCode {
        self.code.status()
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::validation(err.to_string())
    }
}

impl From<CartError> for ApiError {
    fn from(err: CartError) -> Self {
        match err {
            CartError::ProductNotFound(ref id) => {
                ApiError::new(ErrorCode::NotFound, format!("Product not found: {id}"))
            }
            CartError::InvalidQuantity(ref inner) => {
                ApiError::new(ErrorCode::InvalidQuantity, inner.to_string())
            }
            CartError::StockExceeded(shortfall) => {
                let StockShortfall {
                    ref product_id,
                    current_in_cart,
                    stock_available,
                    max_additional,
                    ..
                } = shortfall;
                let message = if max_additional > 0 {
                    format!(
                        "Only {max_additional} more of {product_id} can be added \
                         ({stock_available} in stock, {current_in_cart} in your cart)"
                    )
                } else if current_in_cart == 0 {
                    format!("{product_id} is out of stock")
                } else if current_in_cart == stock_available {
                    format!(
                        "No more of {product_id} can be added: all {stock_available} in stock \
                         are already in your cart"
                    )
                } else {
                    format!(
                        "No more of {product_id} can be added: only {stock_available} left in \
                         stock and your cart has {current_in_cart}"
                    )
                };
                ApiError {
                    shortfall: Some(shortfall),
                    ..ApiError::new(ErrorCode::StockExceeded, message)
                }
            }
            CartError::Validation(inner) => inner.into(),
        }
    }
}

/// Storage errors never reach the client in detail.
impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        tracing::error!(error = %err, "Cart store failure");
        match err {
            StoreError::Database(_) => {
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
            StoreError::Poisoned => ApiError::internal("Internal server error"),
        }
    }
}

/// Session store failures, from loading or minting the cart id.
impl From<tower_sessions::session::Error> for ApiError {
    fn from(err: tower_sessions::session::Error) -> Self {
        tracing::error!(error = %err, "Session store failure");
        ApiError::internal("Internal server error")
    }
}

impl From<CartServiceError> for ApiError {
    fn from(err: CartServiceError) -> Self {
        match err {
            CartServiceError::Cart(err) => err.into(),
            CartServiceError::Store(err) => err.into(),
            CartServiceError::Contention { .. } => {
                tracing::warn!(error = %err, "Cart add abandoned");
                ApiError::new(
                    ErrorCode::Contention,
                    "Stock changed while adding to your cart, please try again",
                )
            }
        }
    }
}

/// Wire shape of a failed cart request.
#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    success: bool,
    error: &'a str,
    code: ErrorCode,
    count: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_additional: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    current_in_cart: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stock_available: Option<i64>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            success: false,
            error: &self.message,
            code: self.code,
            count: self.count,
            max_additional: self.shortfall.as_ref().map(|s| s.max_additional),
            current_in_cart: self.shortfall.as_ref().map(|s| s.current_in_cart),
            stock_available: self.shortfall.as_ref().map(|s| s.stock_available),
        };

        (self.status(), Json(body)).into_response()
    }
}
