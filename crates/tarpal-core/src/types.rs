//! # Domain Types
//!
//! Core domain types used throughout Tarpal.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Customer     │   │      Order      │   │   OrderItem     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │◄──│  customer_id    │◄──│  order_id (FK)  │       │
//! │  │  tier           │   │  order_code     │   │  unit_price     │       │
//! │  │  (Retail/Whsl)  │   │  payment {..}   │   │  (snapshot)     │       │
//! │  └─────────────────┘   │  status_history │   └────────┬────────┘       │
//! │                        └─────────────────┘            │                │
//! │  ┌─────────────────┐   ┌─────────────────┐            │                │
//! │  │  OrderRequest   │   │    Product      │◄───────────┘                │
//! │  │  ─────────────  │   │  ─────────────  │                             │
//! │  │  Pending ──►    │   │  price_retail   │◄──┐                         │
//! │  │  Approved/      │   │  price_wholesale│   │                         │
//! │  │  Rejected       │   │  stock          │   │                         │
//! │  └─────────────────┘   └─────────────────┘   │                         │
//! │                        ┌─────────────────┐   │                         │
//! │                        │ StockHistoryEntry│──┘  (append-only ledger)   │
//! │                        └─────────────────┘                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4 - immutable, used for database relations
//! - Business ID where one exists: `sku` (`TAR-001`), `order_code` (`#ORD-4k2z`)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::{CoreError, ValidationError};
use crate::money::Money;

// =============================================================================
// Customer Tier
// =============================================================================

/// Customer classification deciding which product price applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[ts(export)]
pub enum CustomerTier {
    Retailer,
    Wholesaler,
}

impl fmt::Display for CustomerTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CustomerTier::Retailer => write!(f, "Retailer"),
            CustomerTier::Wholesaler => write!(f, "Wholesaler"),
        }
    }
}

impl FromStr for CustomerTier {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "retailer" => Ok(CustomerTier::Retailer),
            "wholesaler" => Ok(CustomerTier::Wholesaler),
            _ => Err(ValidationError::NotAllowed {
                field: "tier".to_string(),
                allowed: vec!["Retailer".to_string(), "Wholesaler".to_string()],
            }),
        }
    }
}

// =============================================================================
// Customer
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub tier: CustomerTier,
    pub city: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Category
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// Products of a deleted category move here.
pub const FALLBACK_CATEGORY: &str = "Uncategorized";

// =============================================================================
// Product
// =============================================================================

/// Unit a product is sold in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[ts(export)]
pub enum ProductUnit {
    #[default]
    #[serde(rename = "meter")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "meter"))]
    Meter,
    #[serde(rename = "kg")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "kg"))]
    Kg,
    #[serde(rename = "piece")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "piece"))]
    Piece,
    #[serde(rename = "roll")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "roll"))]
    Roll,
    #[serde(rename = "sq.m")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "sq.m"))]
    SqM,
}

/// A sellable product with two independent price tiers.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name.
    pub name: String,

    pub description: Option<String>,

    pub category_id: String,

    /// Price charged to `Retailer` customers.
    pub price_retail_cents: i64,

    /// Price charged to `Wholesaler` customers. No enforced relation to
    /// the retail price.
    pub price_wholesale_cents: i64,

    /// Units on hand. Never negative.
    pub stock: i64,

    pub unit: ProductUnit,

    /// Stock Keeping Unit, `TAR-NNN`.
    pub sku: String,

    /// Sheet weight in grams per square meter.
    pub gsm: i64,

    /// Bumped on every stock change (optimistic concurrency token).
    pub version: i64,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    #[inline]
    pub fn price_retail(&self) -> Money {
        Money::from_cents(self.price_retail_cents)
    }

    #[inline]
    pub fn price_wholesale(&self) -> Money {
        Money::from_cents(self.price_wholesale_cents)
    }

    /// Checks if there is enough stock for the requested quantity.
    #[inline]
    pub fn can_fulfil(&self, quantity: i64) -> bool {
        self.stock >= quantity
    }
}

/// Stock buckets used by the product listing filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    /// More than 20 units.
    InStock,
    /// 1 to 20 units.
    LowStock,
    /// Nothing on hand.
    OutOfStock,
}

/// Upper bound of the `LowStock` listing bucket.
pub const LISTING_LOW_STOCK_MAX: i64 = 20;

impl StockStatus {
    pub fn of(stock: i64) -> Self {
        if stock <= 0 {
            StockStatus::OutOfStock
        } else if stock <= LISTING_LOW_STOCK_MAX {
            StockStatus::LowStock
        } else {
            StockStatus::InStock
        }
    }
}

// =============================================================================
// Order Status
// =============================================================================

/// Lifecycle status of an order.
///
/// `Pending`, `Processing` and `Completed` are only ever produced by the
/// status derivation in [`crate::order`]. `Cancelled` is terminal and set
/// by an explicit administrative action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[ts(export)]
pub enum OrderStatus {
    Pending,
    Processing,
    Completed,
    Cancelled,
}

impl OrderStatus {
    /// Terminal statuses are never overwritten by status derivation.
    #[inline]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Cancelled)
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::Processing => "Processing",
            OrderStatus::Completed => "Completed",
            OrderStatus::Cancelled => "Cancelled",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Payment Status
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[ts(export)]
pub enum PaymentStatus {
    Unpaid,
    #[serde(rename = "Partially Paid")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "Partially Paid"))]
    PartiallyPaid,
    Paid,
}

impl PaymentStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Unpaid => "Unpaid",
            PaymentStatus::PartiallyPaid => "Partially Paid",
            PaymentStatus::Paid => "Paid",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Order
// =============================================================================

/// Payment sub-record of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct PaymentRecord {
    pub amount_paid_cents: i64,
    /// Always `net_payable - amount_paid`.
    pub balance_remaining_cents: i64,
    #[serde(rename = "status")]
    pub payment_status: PaymentStatus,
}

impl PaymentRecord {
    #[inline]
    pub fn amount_paid(&self) -> Money {
        Money::from_cents(self.amount_paid_cents)
    }

    #[inline]
    pub fn balance_remaining(&self) -> Money {
        Money::from_cents(self.balance_remaining_cents)
    }
}

/// One entry of an order's status audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct StatusChange {
    pub status: OrderStatus,
    #[ts(as = "String")]
    pub changed_at: DateTime<Utc>,
}

/// An order header.
///
/// Header money fields are recomputed together by
/// [`Order::recompute`](crate::order); they are never edited one by one.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Order {
    pub id: String,

    /// Human-readable code, `#ORD-xxxx`. Unique.
    pub order_code: String,

    pub customer_id: String,

    /// Tier the customer had when the order was created.
    pub customer_tier: CustomerTier,

    /// Staff member who entered the order, if any.
    pub created_by: Option<String>,

    /// Sum of line totals before discount.
    pub total_amount_cents: i64,

    /// Absolute discount, never a percentage.
    pub discount_cents: i64,

    /// `total_amount - discount`.
    pub net_payable_cents: i64,

    #[cfg_attr(feature = "sqlx", sqlx(flatten))]
    pub payment: PaymentRecord,

    pub status: OrderStatus,

    #[cfg_attr(feature = "sqlx", sqlx(skip))]
    pub status_history: Vec<StatusChange>,

    pub special_instructions: Option<String>,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// A line of an order. Prices are frozen at the time the line was written.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct OrderItem {
    pub id: String,
    pub order_id: String,
    pub product_id: String,
    /// Product name at time of order (frozen).
    pub product_name: String,
    pub quantity: i64,
    /// Unit price at time of order (frozen).
    pub unit_price_cents: i64,
    /// `unit_price × quantity`.
    pub total_price_cents: i64,
    /// Position of the line in the order.
    pub line_no: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl OrderItem {
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    #[inline]
    pub fn total_price(&self) -> Money {
        Money::from_cents(self.total_price_cents)
    }
}

/// A requested `(product, quantity)` pair, before any pricing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct OrderLine {
    pub product_id: String,
    pub quantity: i64,
}

impl OrderLine {
    pub fn new(product_id: impl Into<String>, quantity: i64) -> Self {
        OrderLine {
            product_id: product_id.into(),
            quantity,
        }
    }
}

/// Order header plus its lines.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderDetails {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

/// What order creation hands back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderCreated {
    pub id: String,
    pub order_code: String,
}

// =============================================================================
// Order Payments
// =============================================================================

/// How a payment entry changed `amount_paid`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum PaymentKind {
    /// Added to the running amount (customer paid more).
    Increment,
    /// Replaced the running amount (data correction during an edit).
    Overwrite,
}

/// An audit row for each change to an order's `amount_paid`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct OrderPayment {
    pub id: String,
    pub order_id: String,
    pub kind: PaymentKind,
    /// Amount the caller asked for.
    pub amount_cents: i64,
    /// `amount_paid` after the change was applied.
    pub amount_paid_after_cents: i64,
    pub recorded_by: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Order Request
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[ts(export)]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

impl RequestStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "Pending",
            RequestStatus::Approved => "Approved",
            RequestStatus::Rejected => "Rejected",
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An unpriced order proposal waiting for an administrator.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct OrderRequest {
    pub id: String,
    pub customer_id: String,
    pub status: RequestStatus,
    pub customer_note: Option<String>,
    pub special_instructions: Option<String>,
    pub decision_note: Option<String>,
    pub decided_by: Option<String>,
    #[ts(as = "Option<String>")]
    pub decided_at: Option<DateTime<Utc>>,
    /// Order spawned by approval.
    pub order_id: Option<String>,
    #[cfg_attr(feature = "sqlx", sqlx(skip))]
    pub items: Vec<OrderLine>,
    #[ts(as = "String")]
    pub requested_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Stock Ledger
// =============================================================================

/// Direction of a stock movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum StockAction {
    Add,
    Reduce,
}

impl StockAction {
    pub const fn as_str(&self) -> &'static str {
        match self {
            StockAction::Add => "add",
            StockAction::Reduce => "reduce",
        }
    }
}

impl FromStr for StockAction {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "add" => Ok(StockAction::Add),
            "reduce" => Ok(StockAction::Reduce),
            other => Err(CoreError::InvalidStockAction(other.to_string())),
        }
    }
}

/// Why the stock moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum StockReason {
    /// Direct inventory adjustment by staff.
    Adjustment,
    /// Order created by staff.
    OrderFulfillment,
    /// Order spawned from an approved order request.
    RequestApproval,
    /// Reconciled order line replacement.
    ItemReplacement,
}

/// An immutable ledger row.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct StockHistoryEntry {
    pub id: String,
    pub product_id: String,
    /// Product name when the entry was written (snapshot, not a join).
    pub product_name: String,
    pub action: StockAction,
    pub quantity: i64,
    pub previous_stock: i64,
    pub new_stock: i64,
    pub reason: StockReason,
    /// Order the movement belongs to, for order-driven movements.
    pub reference_id: Option<String>,
    pub remarks: Option<String>,
    pub acting_user_id: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Expense
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[ts(export)]
pub enum ExpenseCategory {
    Worker,
    RawMaterial,
    Daily,
    Transport,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Expense {
    pub id: String,
    pub title: String,
    pub category: ExpenseCategory,
    pub amount_cents: i64,
    pub note: Option<String>,
    #[ts(as = "String")]
    pub expense_date: DateTime<Utc>,
    pub added_by: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Expense {
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

// =============================================================================
// Listing Helpers
// =============================================================================

/// Sort direction on creation time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Newest,
    Oldest,
}

impl SortOrder {
    /// SQL keyword for `ORDER BY created_at`.
    pub const fn sql(&self) -> &'static str {
        match self {
            SortOrder::Newest => "DESC",
            SortOrder::Oldest => "ASC",
        }
    }
}

/// 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl PageRequest {
    pub const MAX_LIMIT: u32 = 200;

    pub fn new(page: u32, limit: u32) -> Self {
        PageRequest {
            page: page.max(1),
            limit: limit.clamp(1, Self::MAX_LIMIT),
        }
    }

    #[inline]
    pub fn offset(&self) -> i64 {
        (self.page.saturating_sub(1) as i64) * self.limit as i64
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        PageRequest::new(1, 10)
    }
}

/// One page of results plus the unpaginated total.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub limit: u32,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_parsing() {
        assert_eq!(
            "wholesaler".parse::<CustomerTier>().unwrap(),
            CustomerTier::Wholesaler
        );
        assert_eq!(
            " Retailer ".parse::<CustomerTier>().unwrap(),
            CustomerTier::Retailer
        );
        assert!("distributor".parse::<CustomerTier>().is_err());
    }

    #[test]
    fn test_stock_action_parsing() {
        assert_eq!("add".parse::<StockAction>().unwrap(), StockAction::Add);
        assert_eq!("REDUCE".parse::<StockAction>().unwrap(), StockAction::Reduce);
        let err = "transfer".parse::<StockAction>().unwrap_err();
        assert!(matches!(err, CoreError::InvalidStockAction(ref a) if a == "transfer"));
    }

    #[test]
    fn test_payment_status_serializes_with_space() {
        let json = serde_json::to_string(&PaymentStatus::PartiallyPaid).unwrap();
        assert_eq!(json, "\"Partially Paid\"");
        let back: PaymentStatus = serde_json::from_str("\"Partially Paid\"").unwrap();
        assert_eq!(back, PaymentStatus::PartiallyPaid);
    }

    #[test]
    fn test_unit_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&ProductUnit::SqM).unwrap(), "\"sq.m\"");
        assert_eq!(ProductUnit::default(), ProductUnit::Meter);
    }

    #[test]
    fn test_stock_status_buckets() {
        assert_eq!(StockStatus::of(0), StockStatus::OutOfStock);
        assert_eq!(StockStatus::of(1), StockStatus::LowStock);
        assert_eq!(StockStatus::of(20), StockStatus::LowStock);
        assert_eq!(StockStatus::of(21), StockStatus::InStock);
    }

    #[test]
    fn test_only_cancelled_is_terminal() {
        assert!(OrderStatus::Cancelled.is_terminal());
        assert!(!OrderStatus::Pending.is_terminal());
        assert!(!OrderStatus::Processing.is_terminal());
        assert!(!OrderStatus::Completed.is_terminal());
    }

    #[test]
    fn test_page_request_bounds() {
        let page = PageRequest::new(0, 0);
        assert_eq!(page.page, 1);
        assert_eq!(page.limit, 1);
        assert_eq!(page.offset(), 0);

        let page = PageRequest::new(3, 10_000);
        assert_eq!(page.limit, PageRequest::MAX_LIMIT);
        assert_eq!(page.offset(), 2 * PageRequest::MAX_LIMIT as i64);
    }
}
