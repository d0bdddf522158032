//! # Error Types
//!
//! Domain-specific error types for pos-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  pos-core errors (this file)                                           │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  pos-db errors (separate crate)                                        │
//! │  ├── DbError          - Database operation failures                    │
//! │  └── WorkflowError    - CoreError | DbError inside a unit of work      │
//! │                                                                         │
//! │  pos-api errors (in app)                                               │
//! │  └── ApiError         - What HTTP clients see (JSON envelope)          │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → WorkflowError → ApiError → Client │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These errors represent business rule violations. Each one aborts the
/// unit of work it happens in.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Product cannot be found.
    ///
    /// ## When This Occurs
    /// - Product ID doesn't exist in database
    /// - Product was soft deleted and a new order references it
    /// - A historical order item points to a product that was hard deleted
    #[error("product with id {0} not found")]
    ProductNotFound(i64),

    /// An order item points at a product that was hard deleted.
    #[error("product '{name}' of order item {item_id} no longer exists")]
    ItemProductMissing { item_id: i64, name: String },

    /// Member customer referenced by an order does not exist.
    #[error("customer with id {0} not found")]
    CustomerNotFound(i64),

    /// Order cannot be found by its transaction number.
    #[error("order {0} not found")]
    OrderNotFound(String),

    /// Insufficient stock to complete an order or an `out` adjustment.
    ///
    /// ## When This Occurs
    /// ```text
    /// Order line (product 7, qty: 5)
    ///      │
    ///      ▼
    /// Check stock: available=3
    ///      │
    ///      ▼
    /// InsufficientStock { product_id: 7, available: 3, requested: 5 }
    ///      │
    ///      ▼
    /// Unit of work rolls back, nothing persisted
    /// ```
    #[error("stock not enough for product {product_id}: available {available}, requested {requested}")]
    InsufficientStock {
        product_id: i64,
        available: i64,
        requested: i64,
    },

    /// Order was already refunded; a second refund is rejected.
    #[error("order {0} already refunded")]
    AlreadyRefunded(String),

    /// Order has more lines than allowed.
    #[error("order cannot have more than {max} items")]
    TooManyLines { max: usize },

    /// A money calculation left the representable range.
    #[error("amount overflow while computing {context}")]
    AmountOverflow { context: String },

    /// Validation error (wraps ValidationError).
    #[error("{0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements.
/// They are always raised before any persistence happens.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too short.
    #[error("{field} must be at least {min} characters")]
    TooShort { field: String, min: usize },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    Negative { field: String },

    /// Invalid format (e.g., malformed decimal, malformed email).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

impl ValidationError {
    /// Shorthand for [`ValidationError::Required`].
    pub fn required(field: &str) -> Self {
        ValidationError::Required {
            field: field.to_string(),
        }
    }

    /// Name of the offending field.
    pub fn field(&self) -> &str {
        match self {
            ValidationError::Required { field }
            | ValidationError::TooShort { field, .. }
            | ValidationError::TooLong { field, .. }
            | ValidationError::OutOfRange { field, .. }
            | ValidationError::MustBePositive { field }
            | ValidationError::Negative { field }
            | ValidationError::InvalidFormat { field, .. }
            | ValidationError::NotAllowed { field, .. } => field,
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientStock {
            product_id: 7,
            available: 3,
            requested: 5,
        };
        assert_eq!(
            err.to_string(),
            "stock not enough for product 7: available 3, requested 5"
        );
        assert_eq!(
            CoreError::AlreadyRefunded("TRX-0-20240101120000-1".into()).to_string(),
            "order TRX-0-20240101120000-1 already refunded"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        assert_eq!(ValidationError::required("items").to_string(), "items is required");

        let err = ValidationError::TooShort {
            field: "password".to_string(),
            min: 6,
        };
        assert_eq!(err.to_string(), "password must be at least 6 characters");
        assert_eq!(err.field(), "password");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let core_err: CoreError = ValidationError::required("payment_method").into();
        assert!(matches!(core_err, CoreError::Validation(_)));
        assert_eq!(core_err.to_string(), "payment_method is required");
    }
}
