//! # Engines
//!
//! Transactional operations that drive the pure rules in `tarpal-core`.
//!
//! ## Write Path
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    One Engine Operation                                 │
//! │                                                                         │
//! │  gate.lock()          ← only if the operation moves stock               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  pool.begin()                                                          │
//! │       │                                                                 │
//! │       ├── load rows            (repository::*::find_in)                 │
//! │       ├── check everything     (no writes yet)                          │
//! │       ├── pure domain step     (Order::create, recompute, ...)          │
//! │       ├── write rows           (repository::*::insert_in, ...)          │
//! │       └── ledger::apply_in     (guarded stock UPDATE + history row)     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  tx.commit()          ← any `?` before this rolls everything back       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod ledger;
pub mod order;
pub mod request;

use std::sync::Arc;
use tokio::sync::Mutex;

pub use ledger::{StockLedger, StockMovement};
pub use order::{CreateOrder, OrderEngine, PaymentReceipt, UpdateOrder};
pub use request::{Approval, RequestQueue, SubmitRequest};

/// Serializes stock mutations across every engine of one `Database`.
pub type StockGate = Arc<Mutex<()>>;
