//! # tarpal-db: Storage and Engines for Tarpal
//!
//! SQLite storage (via sqlx) for the tarpaulin admin backend, plus the
//! transactional engines that own every stock and order mutation.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tarpal Data Flow                                 │
//! │                                                                         │
//! │  Admin API handler (create order, record payment, approve request)     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     tarpal-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐  ┌───────────────┐  ┌────────────────────┐ │   │
//! │  │   │   Database    │  │   Engines     │  │   Repositories     │ │   │
//! │  │   │   (pool.rs)   │  │               │  │                    │ │   │
//! │  │   │               │  │ OrderEngine   │─►│ product, customer  │ │   │
//! │  │   │ SqlitePool    │  │ RequestQueue  │  │ order, request     │ │   │
//! │  │   │ StockGate     │─►│ StockLedger   │  │ stock_history, ... │ │   │
//! │  │   └───────────────┘  └───────────────┘  └────────────────────┘ │   │
//! │  │                                                                 │   │
//! │  │   Reports (read-only)     Migrations (embedded)                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (tarpal.db)                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool, engine construction
//! - [`config`] - `tarpal.toml` + environment configuration
//! - [`engine`] - Order engine, request queue, stock ledger
//! - [`repository`] - Table access (CRUD, listings, transactional helpers)
//! - [`reports`] - Read-only aggregations
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Storage and engine error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tarpal_db::{CreateOrder, Database, DbConfig};
//! use tarpal_core::{Money, OrderLine};
//!
//! let db = Database::new(DbConfig::new("tarpal.db")).await?;
//!
//! let created = db
//!     .order_engine()
//!     .create_order(CreateOrder::new(&customer_id, vec![OrderLine::new(&product_id, 3)]))
//!     .await?;
//!
//! db.order_engine()
//!     .record_payment(&created.id, Money::from_major(150), None)
//!     .await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod engine;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod reports;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{AppConfig, EngineConfig};
pub use error::{DbError, DbResult, EngineError, EngineResult, ErrorResponse};
pub use pool::{Database, DbConfig};

pub use engine::{
    Approval, CreateOrder, OrderEngine, PaymentReceipt, RequestQueue, StockLedger, StockMovement,
    SubmitRequest, UpdateOrder,
};
pub use reports::Reports;

// Repository re-exports for convenience
pub use repository::category::CategoryRepository;
pub use repository::customer::{CustomerFilter, CustomerRepository, CustomerUpdate, NewCustomer};
pub use repository::expense::{ExpenseFilter, ExpenseRepository, ExpenseUpdate, NewExpense};
pub use repository::order::{OrderFilter, OrderListEntry, OrderRepository};
pub use repository::order_request::RequestFilter;
pub use repository::product::{NewProduct, ProductFilter, ProductRepository, ProductUpdate};
