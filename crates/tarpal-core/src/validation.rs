//! # Validation Module
//!
//! Input validation utilities for Tarpal.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Admin dashboard                                              │
//! │  └── Basic format checks, immediate feedback                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  └── Field rules run before any engine opens a transaction             │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── CHECK (stock >= 0), NOT NULL                                      │
//! │  ├── UNIQUE (sku, order_code)                                          │
//! │  └── Foreign key constraints                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use tarpal_core::validation::{validate_quantity, validate_gsm};
//!
//! validate_quantity(5).unwrap();
//! assert!(validate_gsm(80).is_err());
//! ```

use crate::error::ValidationError;
use crate::types::OrderLine;
use crate::{MAX_AMOUNT_CENTS, MAX_LINE_QUANTITY, MAX_ORDER_LINES, MIN_GSM};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a required display name (product, customer, category).
///
/// ## Rules
/// - Must not be empty after trimming
/// - At most 200 characters
pub fn validate_name(field: &str, name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::required(field));
    }

    if name.chars().count() > 200 {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: 200,
        });
    }

    Ok(())
}

/// Validates an email address. Only the rough shape is checked.
pub fn validate_email(email: &str) -> ValidationResult<()> {
    let email = email.trim();

    if email.is_empty() {
        return Err(ValidationError::required("email"));
    }

    let well_formed = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.')
        }
        None => false,
    };
    if !well_formed || email.contains(char::is_whitespace) {
        return Err(ValidationError::InvalidFormat {
            field: "email".to_string(),
            reason: "must look like name@example.com".to_string(),
        });
    }

    Ok(())
}

/// Validates a phone number: digits with optional `+`, spaces and hyphens,
/// at least 7 digits.
pub fn validate_phone(phone: &str) -> ValidationResult<()> {
    let phone = phone.trim();

    if phone.is_empty() {
        return Err(ValidationError::required("phone"));
    }

    let allowed = phone
        .chars()
        .all(|c| c.is_ascii_digit() || c == '+' || c == ' ' || c == '-');
    let digits = phone.chars().filter(|c| c.is_ascii_digit()).count();
    if !allowed || digits < 7 {
        return Err(ValidationError::InvalidFormat {
            field: "phone".to_string(),
            reason: "must contain at least 7 digits".to_string(),
        });
    }

    Ok(())
}

/// Validates a search query. Empty means "no filter".
///
/// ## Returns
/// The trimmed query string.
pub fn validate_search_query(query: &str) -> ValidationResult<String> {
    let query = query.trim();

    if query.len() > 100 {
        return Err(ValidationError::TooLong {
            field: "search".to_string(),
            max: 100,
        });
    }

    Ok(query.to_string())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates an order line quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed [`MAX_LINE_QUANTITY`]
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_LINE_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_LINE_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a money amount in cents.
///
/// ## Rules
/// - Zero or more
/// - At most [`MAX_AMOUNT_CENTS`]
pub fn validate_amount_cents(field: &str, cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::Negative {
            field: field.to_string(),
        });
    }

    if cents > MAX_AMOUNT_CENTS {
        return Err(amount_out_of_range(field));
    }

    Ok(())
}

/// The error for an amount above [`MAX_AMOUNT_CENTS`], or one whose
/// arithmetic would overflow.
pub fn amount_out_of_range(field: &str) -> ValidationError {
    ValidationError::OutOfRange {
        field: field.to_string(),
        min: 0,
        max: MAX_AMOUNT_CENTS,
    }
}

/// Validates sheet weight. Must be at least [`MIN_GSM`].
pub fn validate_gsm(gsm: i64) -> ValidationResult<()> {
    if gsm < MIN_GSM {
        return Err(ValidationError::OutOfRange {
            field: "gsm".to_string(),
            min: MIN_GSM,
            max: i64::MAX,
        });
    }

    Ok(())
}

// =============================================================================
// Collection Validators
// =============================================================================

/// Validates a set of requested order lines.
///
/// ## Rules
/// - At least one line, at most [`MAX_ORDER_LINES`]
/// - Every line names a product
/// - Every quantity passes [`validate_quantity`]
pub fn validate_lines(lines: &[OrderLine]) -> ValidationResult<()> {
    if lines.is_empty() {
        return Err(ValidationError::required("items"));
    }

    if lines.len() > MAX_ORDER_LINES {
        return Err(ValidationError::OutOfRange {
            field: "items".to_string(),
            min: 1,
            max: MAX_ORDER_LINES as i64,
        });
    }

    for line in lines {
        if line.product_id.trim().is_empty() {
            return Err(ValidationError::required("product_id"));
        }
        validate_quantity(line.quantity)?;
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
