//! # Error Types
//!
//! Domain-specific error types for cartwright-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  cartwright-core errors (this file)                                    │
//! │  ├── CartError        - Cart rule violations (404 / 400)               │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  cartwright-db errors (separate crate)                                 │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  HTTP errors (in app)                                                  │
//! │  └── ApiError         - What the storefront sees (JSON)                │
//! │                                                                         │
//! │  Flow: ValidationError → CartError → ApiError → Storefront             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! None of these are fatal: every variant is answered at the request
//! boundary and the cart is left exactly as it was.

use thiserror::Error;

use crate::types::StockShortfall;

// =============================================================================
// Cart Error
// =============================================================================

/// Cart rule violations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    /// Product cannot be found.
    ///
    /// ## When This Occurs
    /// - Product ID doesn't exist in the catalog
    /// - Product was deactivated (soft delete)
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Requested quantity is not a positive integer.
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(ValidationError),

    /// Adding the requested quantity would exceed `quantity_on_hand`.
    ///
    /// ## User Workflow
    /// ```text
    /// Cart holds 2 mugs, stock is 5
    ///      │
    ///      ▼
    /// Add to Cart (qty: 4)
    ///      │
    ///      ▼
    /// StockExceeded { current_in_cart: 2, stock_available: 5, max_additional: 3 }
    ///      │
    ///      ▼
    /// Storefront shows: "You can add 3 more"
    /// ```
    #[error(
        "Insufficient stock for {}: {} available, {} in cart, {} requested",
        .0.product_id,
        .0.stock_available,
        .0.current_in_cart,
        .0.requested
    )]
    StockExceeded(StockShortfall),

    /// Other input validation failure (e.g., malformed product id).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CartError {
    /// Returns the shortfall details for stock errors.
    pub fn shortfall(&self) -> Option<&StockShortfall> {
        match self {
            CartError::StockExceeded(shortfall) => Some(shortfall),
            _ => None,
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when request input doesn't meet requirements.
/// Used for early validation before the stock rule runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., fractional quantity, invalid UUID).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CartError.
pub type CartResult<T> = Result<T, CartError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stock_exceeded_message() {
        let err = CartError::StockExceeded(StockShortfall::new("mug", 4, 2, 5));
        assert_eq!(
            err.to_string(),
            "Insufficient stock for mug: 5 available, 2 in cart, 4 requested"
        );
        assert_eq!(err.shortfall().map(|s| s.max_additional), Some(3));
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::MustBePositive {
            field: "quantity".to_string(),
        };
        assert_eq!(err.to_string(), "quantity must be positive");

        let err = CartError::InvalidQuantity(err);
        assert_eq!(err.to_string(), "Invalid quantity: quantity must be positive");
        assert!(err.shortfall().is_none());
    }

    #[test]
    fn test_validation_converts_to_cart_error() {
        let validation_err = ValidationError::Required {
            field: "product_id".to_string(),
        };
        let cart_err: CartError = validation_err.into();
        assert!(matches!(cart_err, CartError::Validation(_)));
    }
}
