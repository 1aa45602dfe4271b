//! # Validation Module
//!
//! Input validation for cart requests.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Storefront (JavaScript)                                      │
//! │  └── Quantity picker limits, immediate feedback                        │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: HTTP handler (Rust)                                          │
//! │  ├── Bodies arrive as untyped JSON                                     │
//! │  └── THIS MODULE: parse + validate quantity / product id               │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Cart rule (cart.rs)                                          │
//! │  └── Stock ceiling                                                     │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 4: Database (SQLite)                                            │
//! │  └── CHECK (quantity > 0), CHECK (quantity_on_hand >= 0)               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use serde_json::json;
//! use cartwright_core::validation::{parse_product_id, parse_quantity};
//!
//! assert_eq!(parse_quantity(Some(&json!(3))).unwrap(), 3);
//! assert_eq!(parse_quantity(Some(&json!("2"))).unwrap(), 2);
//! assert_eq!(parse_quantity(None).unwrap(), 1);
//! assert!(parse_quantity(Some(&json!(1.5))).is_err());
//!
//! assert_eq!(parse_product_id(&json!(42)).unwrap(), "42");
//! ```

use serde_json::Value;

use crate::error::ValidationError;
use crate::{DEFAULT_ADD_QUANTITY, MAX_ITEM_QUANTITY};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

const PRODUCT_ID_MAX_LEN: usize = 64;

// =============================================================================
// Quantity
// =============================================================================

/// Validates a quantity value.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY (999)
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Parses the `quantity` field of a request body.
///
/// ## Accepted
/// - absent or `null` → 1
/// - JSON integers: `3`
/// - integer strings: `"3"` (form posts relayed as JSON)
///
/// ## Rejected
/// - fractions (`1.5`), booleans, arrays, objects, non-numeric strings
/// - zero, negatives, values above MAX_ITEM_QUANTITY
pub fn parse_quantity(value: Option<&Value>) -> ValidationResult<i64> {
    let qty = match value {
        None | Some(Value::Null) => DEFAULT_ADD_QUANTITY,
        Some(Value::Number(n)) => match n.as_i64() {
            Some(qty) => qty,
            // u64 above i64::MAX is still a whole number, just far too large
            None if n.is_u64() => i64::MAX,
            None => return Err(not_an_integer()),
        },
        Some(Value::String(s)) => s.trim().parse::<i64>().map_err(|_| not_an_integer())?,
        Some(_) => return Err(not_an_integer()),
    };

    validate_quantity(qty)?;
    Ok(qty)
}

fn not_an_integer() -> ValidationError {
    ValidationError::InvalidFormat {
        field: "quantity".to_string(),
        reason: "must be a whole number".to_string(),
    }
}

// =============================================================================
// Product Identifier
// =============================================================================

/// Validates a catalog product identifier.
///
/// ## Rules
/// - Must not be empty
/// - At most 64 characters
/// - Letters, digits, hyphens, underscores only
pub fn validate_product_id(id: &str) -> ValidationResult<()> {
    if id.is_empty() {
        return Err(ValidationError::Required {
            field: "product_id".to_string(),
        });
    }

    if id.len() > PRODUCT_ID_MAX_LEN {
        return Err(ValidationError::TooLong {
            field: "product_id".to_string(),
            max: PRODUCT_ID_MAX_LEN,
        });
    }

    if !id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "product_id".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

/// Parses the `product_id` field of a request body.
///
/// Catalog ids may arrive as strings or bare integers; integers are
/// normalised to their decimal form.
pub fn parse_product_id(value: &Value) -> ValidationResult<String> {
    let id = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) if n.is_u64() || n.is_i64() => n.to_string(),
        Value::Null => {
            return Err(ValidationError::Required {
                field: "product_id".to_string(),
            })
        }
        _ => {
            return Err(ValidationError::InvalidFormat {
                field: "product_id".to_string(),
                reason: "must be a string or integer".to_string(),
            })
        }
    };

    validate_product_id(&id)?;
    Ok(id)
}

// =============================================================================
// Session Identifier
// =============================================================================

/// Validates a cart session id (UUID).
///
/// ## Example
/// ```rust
/// use cartwright_core::validation::validate_session_id;
///
/// assert!(validate_session_id("550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_session_id("not-a-uuid").is_err());
/// ```
pub fn validate_session_id(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "session".to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: "session".to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
