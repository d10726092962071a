//! # Error Types
//!
//! Domain-specific error types for tarpal-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  tarpal-core errors (this file)                                        │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  tarpal-db errors (separate crate)                                     │
//! │  ├── DbError          - Database operation failures                    │
//! │  └── EngineError      - CoreError | DbError, what engines return       │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → EngineError → ErrorResponse       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every `CoreError` falls in exactly one [`ErrorKind`]: a missing record,
//! a rejected input, or a conflict with the current state of a record.

use serde::{Deserialize, Serialize};
use thiserror::Error;

// =============================================================================
// Error Kind
// =============================================================================

/// Category of a failure, as reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// A referenced record does not exist.
    NotFound,
    /// Input or business-rule validation failed.
    Validation,
    /// The record is in a state that forbids the operation.
    Conflict,
    /// The storage layer failed.
    Storage,
}

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Customer not found: {0}")]
    CustomerNotFound(String),

    #[error("Product not found: {0}")]
    ProductNotFound(String),

    #[error("Category not found: {0}")]
    CategoryNotFound(String),

    #[error("Order not found: {0}")]
    OrderNotFound(String),

    #[error("Order request not found: {0}")]
    OrderRequestNotFound(String),

    #[error("Expense not found: {0}")]
    ExpenseNotFound(String),

    /// Not enough stock to fulfil an order line.
    ///
    /// ## User Workflow
    /// ```text
    /// Create order (3 lines)
    ///      │
    ///      ▼
    /// Line 2: "PE Tarpaulin 12x18" available=4, requested=6
    ///      │
    ///      ▼
    /// InsufficientStock → whole order rejected, no stock touched
    /// ```
    #[error(
        "Insufficient stock for \"{product_name}\". Available: {available}, Requested: {requested}"
    )]
    InsufficientStock {
        product_id: String,
        product_name: String,
        available: i64,
        requested: i64,
    },

    /// A direct `reduce` adjustment asked for more than is on hand.
    #[error("Insufficient stock to reduce {product_name}: available {available}, requested {requested}")]
    InsufficientStockToReduce {
        product_id: String,
        product_name: String,
        available: i64,
        requested: i64,
    },

    #[error("Invalid stock action: {0}")]
    InvalidStockAction(String),

    #[error("Discount {discount_cents} exceeds order total {total_cents}")]
    DiscountExceedsTotal { discount_cents: i64, total_cents: i64 },

    /// Pending/Processing/Completed only come from payment state.
    #[error("Order status {0} is derived from payments and cannot be set directly")]
    DerivedStatus(String),

    #[error("Order request {request_id} is already {status}")]
    RequestAlreadyDecided { request_id: String, status: String },

    #[error("Order {order_code} is {status}, cannot perform operation")]
    OrderClosed { order_code: String, status: String },

    #[error("Could not allocate a unique order code after {attempts} attempts")]
    OrderCodeExhausted { attempts: u32 },

    #[error("Category \"{0}\" cannot be deleted")]
    ProtectedCategory(String),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Classifies the error for structured responses.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::CustomerNotFound(_)
            | CoreError::ProductNotFound(_)
            | CoreError::CategoryNotFound(_)
            | CoreError::OrderNotFound(_)
            | CoreError::OrderRequestNotFound(_)
            | CoreError::ExpenseNotFound(_) => ErrorKind::NotFound,

            CoreError::RequestAlreadyDecided { .. } | CoreError::OrderClosed { .. } => {
                ErrorKind::Conflict
            }

            CoreError::OrderCodeExhausted { .. } => ErrorKind::Storage,

            CoreError::InsufficientStock { .. }
            | CoreError::InsufficientStockToReduce { .. }
            | CoreError::InvalidStockAction(_)
            | CoreError::DiscountExceedsTotal { .. }
            | CoreError::DerivedStatus(_)
            | CoreError::ProtectedCategory(_)
            | CoreError::Validation(_) => ErrorKind::Validation,
        }
    }

    /// Machine-readable code, stable across message wording changes.
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::CustomerNotFound(_) => "CUSTOMER_NOT_FOUND",
            CoreError::ProductNotFound(_) => "PRODUCT_NOT_FOUND",
            CoreError::CategoryNotFound(_) => "CATEGORY_NOT_FOUND",
            CoreError::OrderNotFound(_) => "ORDER_NOT_FOUND",
            CoreError::OrderRequestNotFound(_) => "ORDER_REQUEST_NOT_FOUND",
            CoreError::ExpenseNotFound(_) => "EXPENSE_NOT_FOUND",
            CoreError::InsufficientStock { .. } => "INSUFFICIENT_STOCK",
            CoreError::InsufficientStockToReduce { .. } => "INSUFFICIENT_STOCK",
            CoreError::InvalidStockAction(_) => "INVALID_STOCK_ACTION",
            CoreError::DiscountExceedsTotal { .. } => "DISCOUNT_EXCEEDS_TOTAL",
            CoreError::DerivedStatus(_) => "DERIVED_STATUS",
            CoreError::RequestAlreadyDecided { .. } => "REQUEST_ALREADY_DECIDED",
            CoreError::OrderClosed { .. } => "ORDER_CLOSED",
            CoreError::OrderCodeExhausted { .. } => "ORDER_CODE_EXHAUSTED",
            CoreError::ProtectedCategory(_) => "PROTECTED_CATEGORY",
            CoreError::Validation(_) => "VALIDATION_ERROR",
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Used for early validation before business logic runs.
#[derive(Debug, Error)]
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

    /// Value must be strictly positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must be zero or more.
    #[error("{field} cannot be negative")]
    Negative { field: String },

    /// Invalid format (e.g., invalid UUID, invalid email).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

impl ValidationError {
    pub fn required(field: impl Into<String>) -> Self {
        ValidationError::Required {
            field: field.into(),
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
    fn test_insufficient_stock_message_names_product() {
        let err = CoreError::InsufficientStock {
            product_id: "p-1".to_string(),
            product_name: "HDPE Tarpaulin 10x12".to_string(),
            available: 4,
            requested: 6,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for \"HDPE Tarpaulin 10x12\". Available: 4, Requested: 6"
        );
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.code(), "INSUFFICIENT_STOCK");
    }

    #[test]
    fn test_kinds() {
        assert_eq!(
            CoreError::OrderNotFound("x".into()).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            CoreError::RequestAlreadyDecided {
                request_id: "r".into(),
                status: "Approved".into()
            }
            .kind(),
            ErrorKind::Conflict
        );
        assert_eq!(
            CoreError::InvalidStockAction("move".into()).kind(),
            ErrorKind::Validation
        );
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let core_err: CoreError = ValidationError::required("items").into();
        assert!(matches!(core_err, CoreError::Validation(_)));
        assert_eq!(core_err.to_string(), "Validation error: items is required");
    }
}
