//! # Repository Module
//!
//! Database repository implementations for Tarpal.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Two Ways Into a Table                                │
//! │                                                                         │
//! │  Repository struct (holds SqlitePool)                                  │
//! │  ├── plain CRUD and listings                                           │
//! │  └── each call is its own statement                                    │
//! │                                                                         │
//! │  `*_in(conn, ..)` free functions                                        │
//! │  ├── take `&mut SqliteConnection`                                       │
//! │  └── used by engines inside one open transaction                       │
//! │                                                                         │
//! │  Engines never touch the pool while their transaction is open, so     │
//! │  a single-connection pool cannot deadlock.                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`category::CategoryRepository`] - Categories with the `Uncategorized` fallback
//! - [`product::ProductRepository`] - Products, SKU generation, filtered listing
//! - [`customer::CustomerRepository`] - Customers and their price tier
//! - [`order::OrderRepository`] - Order reads (details, listings, payment log)
//! - [`order_request`] - Order request rows and items
//! - [`stock_history`] - Append-only ledger rows
//! - [`expense::ExpenseRepository`] - Business expenses

pub mod category;
pub mod customer;
pub mod expense;
pub mod order;
pub mod order_request;
pub mod product;
pub mod stock_history;

use tarpal_core::{Page, PageRequest};

/// Wraps one page of rows with the unpaginated count.
pub(crate) fn page_of<T>(items: Vec<T>, total: i64, page: PageRequest) -> Page<T> {
    Page {
        items,
        total,
        page: page.page,
        limit: page.limit,
    }
}

/// `%term%` for a LIKE filter.
pub(crate) fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

/// Generates a new entity ID.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
