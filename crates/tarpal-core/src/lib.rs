//! # tarpal-core: Pure Business Logic for Tarpal
//!
//! Order lifecycle, payment reconciliation and stock rules for the Tarpal
//! admin backend, as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tarpal Architecture                              │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Admin dashboard / API                        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    tarpal-db (Engines + Storage)                │   │
//! │  │   OrderEngine • RequestQueue • StockLedger • Reports            │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ tarpal-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐  │   │
//! │  │   │  types  │ │  money  │ │ pricing │ │  order  │ │  stock  │  │   │
//! │  │   └─────────┘ └─────────┘ └─────────┘ └─────────┘ └─────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Customer, Order, OrderRequest, ...)
//! - [`money`] - Money type with integer arithmetic
//! - [`pricing`] - Tier-based unit price resolution
//! - [`order`] - Status derivation and order header transitions
//! - [`request`] - Order request state machine
//! - [`stock`] - Stock arithmetic and demand aggregation
//! - [`policy`] - Engine behavior switches
//! - [`validation`] - Field rules
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use tarpal_core::order::derive_status;
//! use tarpal_core::{Money, OrderStatus, PaymentStatus};
//!
//! let net = Money::from_major(300);
//! let (payment, order) = derive_status(Money::from_major(150), net);
//! assert_eq!(payment, PaymentStatus::PartiallyPaid);
//! assert_eq!(order, OrderStatus::Processing);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod money;
pub mod order;
pub mod policy;
pub mod pricing;
pub mod request;
pub mod stock;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ErrorKind, ValidationError};
pub use money::Money;
pub use policy::{ItemReplacementStock, OverpaymentPolicy, TierPolicy};
pub use pricing::{resolve_unit_price, PricedLine};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum lines in one order or order request.
pub const MAX_ORDER_LINES: usize = 100;

/// Maximum quantity on a single line.
///
/// Catches typos like 10000 for 100 before they hit stock.
pub const MAX_LINE_QUANTITY: i64 = 9_999;

/// Largest money amount accepted anywhere: prices, payments, line and
/// order totals (₹1,000 crore in paise).
pub const MAX_AMOUNT_CENTS: i64 = 1_000_000_000_000;

/// Minimum sheet weight in grams per square meter.
pub const MIN_GSM: i64 = 100;

/// Default low-stock threshold for inventory reports.
pub const DEFAULT_LOW_STOCK_THRESHOLD: i64 = 10;

/// Outstanding balance (₹5,000 in paise) at which a customer is listed as
/// high-due.
pub const DEFAULT_HIGH_DUE_CENTS: i64 = 5_000_00;
