//! # Database and Engine Error Types
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)        Business rule (CoreError)           │
//! │       │                                   │                             │
//! │       ▼                                   │                             │
//! │  DbError  ← adds categorization           │                             │
//! │       │                                   │                             │
//! │       └──────────────┬────────────────────┘                             │
//! │                      ▼                                                  │
//! │               EngineError  ← what every engine returns                 │
//! │                      │                                                  │
//! │                      ▼                                                  │
//! │               ErrorResponse { kind, code, message, context }           │
//! │                      │                                                  │
//! │                      ▼                                                  │
//! │               Admin dashboard shows the message                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;
use serde_json::json;
use thiserror::Error;

use tarpal_core::{CoreError, ErrorKind};

// =============================================================================
// DbError
// =============================================================================

/// Database operation errors.
///
/// These errors wrap sqlx errors and provide additional context
/// for debugging and user feedback.
#[derive(Debug, Error)]
pub enum DbError {
    /// Entity not found in database.
    ///
    /// ## When This Occurs
    /// - `fetch_one` returns no rows
    /// - ID doesn't exist
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Unique constraint violation.
    ///
    /// ## When This Occurs
    /// - Inserting a duplicate SKU or category name
    /// - Order code collision
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// Foreign key constraint violation.
    ///
    /// ## When This Occurs
    /// - Deleting a customer that still has orders
    /// - Referencing a non-existent category
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// Database connection failed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Transaction failed.
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Configuration could not be loaded.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates a UniqueViolation error.
    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }

    /// True for a UNIQUE failure on the given column (`table.column`).
    pub fn is_unique_violation_on(&self, column: &str) -> bool {
        matches!(self, DbError::UniqueViolation { field, .. } if field.contains(column))
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            DbError::NotFound { .. } => ErrorKind::NotFound,
            DbError::UniqueViolation { .. } | DbError::ForeignKeyViolation { .. } => {
                ErrorKind::Conflict
            }
            _ => ErrorKind::Storage,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            DbError::NotFound { .. } => "NOT_FOUND",
            DbError::UniqueViolation { .. } => "DUPLICATE",
            DbError::ForeignKeyViolation { .. } => "FOREIGN_KEY_VIOLATION",
            DbError::Config(_) => "CONFIG_ERROR",
            _ => "DATABASE_ERROR",
        }
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound    → DbError::NotFound
/// sqlx::Error::Database       → Analyze message for constraint type
/// sqlx::Error::PoolTimedOut   → DbError::PoolExhausted
/// Other                       → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::NotFound {
                entity: "Record".to_string(),
                id: "unknown".to_string(),
            },

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();

                // SQLite reports constraints as:
                // "UNIQUE constraint failed: <table>.<column>"
                // "FOREIGN KEY constraint failed"
                if msg.contains("UNIQUE constraint failed") {
                    let field = msg
                        .split("UNIQUE constraint failed: ")
                        .nth(1)
                        .unwrap_or("unknown")
                        .to_string();
                    DbError::UniqueViolation {
                        field,
                        value: "unknown".to_string(),
                    }
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

// =============================================================================
// EngineError
// =============================================================================

/// Error returned by the order engine, request queue, stock ledger and
/// the catalog services: either a business rule or a storage failure.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Db(#[from] DbError),
}

impl From<sqlx::Error> for EngineError {
    fn from(err: sqlx::Error) -> Self {
        EngineError::Db(err.into())
    }
}

impl From<tarpal_core::ValidationError> for EngineError {
    fn from(err: tarpal_core::ValidationError) -> Self {
        EngineError::Core(err.into())
    }
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::Core(e) => e.kind(),
            EngineError::Db(e) => e.kind(),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            EngineError::Core(e) => e.code(),
            EngineError::Db(e) => e.code(),
        }
    }

    /// Returns the business error, if this is one.
    pub fn as_core(&self) -> Option<&CoreError> {
        match self {
            EngineError::Core(e) => Some(e),
            EngineError::Db(_) => None,
        }
    }
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

// =============================================================================
// ErrorResponse
// =============================================================================

/// Serializable error shape for callers.
///
/// ## Example
/// ```json
/// {
///   "kind": "validation",
///   "code": "INSUFFICIENT_STOCK",
///   "message": "Insufficient stock for \"PE Tarpaulin\". Available: 4, Requested: 6",
///   "context": { "product_id": "…", "product_name": "PE Tarpaulin",
///                "available": 4, "requested": 6 }
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub kind: ErrorKind,
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "serde_json::Value::is_null")]
    pub context: serde_json::Value,
}

fn core_context(err: &CoreError) -> serde_json::Value {
    match err {
        CoreError::CustomerNotFound(id) => json!({ "customer_id": id }),
        CoreError::ProductNotFound(id) => json!({ "product_id": id }),
        CoreError::CategoryNotFound(id) => json!({ "category_id": id }),
        CoreError::OrderNotFound(id) => json!({ "order_id": id }),
        CoreError::OrderRequestNotFound(id) => json!({ "request_id": id }),
        CoreError::ExpenseNotFound(id) => json!({ "expense_id": id }),
        CoreError::InsufficientStock {
            product_id,
            product_name,
            available,
            requested,
        }
        | CoreError::InsufficientStockToReduce {
            product_id,
            product_name,
            available,
            requested,
        } => json!({
            "product_id": product_id,
            "product_name": product_name,
            "available": available,
            "requested": requested,
        }),
        CoreError::DiscountExceedsTotal {
            discount_cents,
            total_cents,
        } => json!({ "discount_cents": discount_cents, "total_cents": total_cents }),
        CoreError::RequestAlreadyDecided { request_id, status } => {
            json!({ "request_id": request_id, "status": status })
        }
        CoreError::OrderClosed { order_code, status } => {
            json!({ "order_code": order_code, "status": status })
        }
        CoreError::DerivedStatus(status) => json!({ "status": status }),
        CoreError::InvalidStockAction(action) => json!({ "action": action }),
        _ => serde_json::Value::Null,
    }
}

impl From<&EngineError> for ErrorResponse {
    fn from(err: &EngineError) -> Self {
        let context = match err {
            EngineError::Core(core) => core_context(core),
            EngineError::Db(DbError::NotFound { entity, id }) => {
                json!({ "entity": entity, "id": id })
            }
            EngineError::Db(DbError::UniqueViolation { field, .. }) => json!({ "field": field }),
            EngineError::Db(_) => serde_json::Value::Null,
        };
        ErrorResponse {
            kind: err.kind(),
            code: err.code().to_string(),
            message: err.to_string(),
            context,
        }
    }
}

impl From<EngineError> for ErrorResponse {
    fn from(err: EngineError) -> Self {
        ErrorResponse::from(&err)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
