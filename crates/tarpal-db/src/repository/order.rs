//! # Order Repository
//!
//! Order rows: header, items, status history and the payment log.
//!
//! ## Write Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Order Writes (inside an engine tx)                   │
//! │                                                                         │
//! │  insert_order_in(header)                                               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  insert_items_in(order_id, priced lines)  ← prices frozen here         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  insert_history_in(order_id, new entries)                              │
//! │                                                                         │
//! │  Item replacement = delete_items_in + insert_items_in                  │
//! │  (bulk delete-then-recreate, never a diff)                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The struct [`OrderRepository`] is read-only; mutations go through the
//! order engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::debug;

use tarpal_core::validation::validate_search_query;
use tarpal_core::{
    CustomerTier, Order, OrderDetails, OrderItem, OrderPayment, OrderStatus, Page, PageRequest,
    PaymentStatus, PricedLine, SortOrder, StatusChange,
};

use crate::error::{DbError, DbResult, EngineResult};
use crate::repository::{like_pattern, new_id, page_of};

// =============================================================================
// Listing Types
// =============================================================================

/// Order listing filter. All fields combine with AND.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub payment_status: Option<PaymentStatus>,
    /// Tier stored on the order.
    pub tier: Option<CustomerTier>,
    /// Matched against the customer's name.
    pub customer_search: Option<String>,
    #[serde(default)]
    pub sort: SortOrder,
}

impl OrderFilter {
    fn push_where(&self, qb: &mut QueryBuilder<'_, Sqlite>, search: Option<String>) {
        qb.push(" WHERE 1 = 1");
        if let Some(status) = self.status {
            qb.push(" AND o.status = ").push_bind(status);
        }
        if let Some(payment_status) = self.payment_status {
            qb.push(" AND o.payment_status = ").push_bind(payment_status);
        }
        if let Some(tier) = self.tier {
            qb.push(" AND o.customer_tier = ").push_bind(tier);
        }
        if let Some(term) = search {
            qb.push(" AND c.name LIKE ")
                .push_bind(like_pattern(&term))
                .push(" ESCAPE '\\'");
        }
    }
}

/// One row of the order listing. `order.status_history` is not loaded.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct OrderListEntry {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub order: Order,
    pub customer_name: String,
}

// =============================================================================
// Repository
// =============================================================================

/// Read access to orders.
///
/// ## Usage
/// ```rust,ignore
/// let details = db.orders().get_order_details(&order_id).await?;
/// let page = db.orders().list_orders(&OrderFilter::default(), PageRequest::default()).await?;
/// ```
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    /// Order header with its status history.
    pub async fn get(&self, id: &str) -> DbResult<Option<Order>> {
        let mut conn = self.pool.acquire().await?;
        find_in(&mut conn, id).await
    }

    pub async fn get_by_code(&self, order_code: &str) -> DbResult<Option<Order>> {
        let mut conn = self.pool.acquire().await?;
        let id: Option<String> = sqlx::query_scalar("SELECT id FROM orders WHERE order_code = ?1")
            .bind(order_code)
            .fetch_optional(&mut *conn)
            .await?;
        match id {
            Some(id) => find_in(&mut conn, &id).await,
            None => Ok(None),
        }
    }

    /// Header, status history and items.
    pub async fn get_order_details(&self, id: &str) -> DbResult<Option<OrderDetails>> {
        let mut conn = self.pool.acquire().await?;
        details_in(&mut conn, id).await
    }

    /// Paginated listing joined with the customer's name.
    pub async fn list_orders(
        &self,
        filter: &OrderFilter,
        page: PageRequest,
    ) -> EngineResult<Page<OrderListEntry>> {
        let search = match filter.customer_search.as_deref() {
            Some(raw) => Some(validate_search_query(raw)?).filter(|s| !s.is_empty()),
            None => None,
        };

        let mut count_qb: QueryBuilder<'_, Sqlite> = QueryBuilder::new(
            "SELECT COUNT(*) FROM orders o JOIN customers c ON c.id = o.customer_id",
        );
        filter.push_where(&mut count_qb, search.clone());
        let total = count_qb
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
            .map_err(DbError::from)?;

        let mut qb: QueryBuilder<'_, Sqlite> = QueryBuilder::new(
            "SELECT o.*, c.name AS customer_name FROM orders o JOIN customers c ON c.id = o.customer_id",
        );
        filter.push_where(&mut qb, search);
        let dir = filter.sort.sql();
        qb.push(format!(" ORDER BY o.created_at {dir}, o.rowid {dir} LIMIT "))
            .push_bind(page.limit)
            .push(" OFFSET ")
            .push_bind(page.offset());

        let items = qb
            .build_query_as::<OrderListEntry>()
            .fetch_all(&self.pool)
            .await
            .map_err(DbError::from)?;

        debug!(total, returned = items.len(), "Listed orders");
        Ok(page_of(items, total, page))
    }

    /// Latest orders, newest first.
    pub async fn recent_orders(&self, limit: u32) -> DbResult<Vec<OrderListEntry>> {
        let orders = sqlx::query_as::<_, OrderListEntry>(
            r#"
            SELECT o.*, c.name AS customer_name
            FROM orders o JOIN customers c ON c.id = o.customer_id
            ORDER BY o.created_at DESC, o.rowid DESC
            LIMIT ?1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(orders)
    }

    /// Payment log of one order, oldest first.
    pub async fn payments(&self, order_id: &str) -> DbResult<Vec<OrderPayment>> {
        let payments = sqlx::query_as::<_, OrderPayment>(
            "SELECT * FROM order_payments WHERE order_id = ?1 ORDER BY created_at, rowid",
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(payments)
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

// =============================================================================
// Transactional helpers
// =============================================================================

/// Header plus status history.
pub(crate) async fn find_in(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Order>> {
    let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = ?1")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    let Some(mut order) = order else {
        return Ok(None);
    };

    order.status_history = sqlx::query_as::<_, StatusChange>(
        "SELECT status, changed_at FROM order_status_history WHERE order_id = ?1 ORDER BY seq",
    )
    .bind(id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(Some(order))
}

pub(crate) async fn details_in(
    conn: &mut SqliteConnection,
    id: &str,
) -> DbResult<Option<OrderDetails>> {
    let Some(order) = find_in(conn, id).await? else {
        return Ok(None);
    };
    let items = items_in(conn, id).await?;
    Ok(Some(OrderDetails { order, items }))
}

pub(crate) async fn items_in(conn: &mut SqliteConnection, order_id: &str) -> DbResult<Vec<OrderItem>> {
    let items = sqlx::query_as::<_, OrderItem>(
        "SELECT * FROM order_items WHERE order_id = ?1 ORDER BY line_no",
    )
    .bind(order_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(items)
}

/// Inserts the header only. A code collision surfaces as
/// `UniqueViolation` on `orders.order_code`.
pub(crate) async fn insert_order_in(conn: &mut SqliteConnection, order: &Order) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO orders (
            id, order_code, customer_id, customer_tier, created_by,
            total_amount_cents, discount_cents, net_payable_cents,
            amount_paid_cents, balance_remaining_cents, payment_status,
            status, special_instructions, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
        "#,
    )
    .bind(&order.id)
    .bind(&order.order_code)
    .bind(&order.customer_id)
    .bind(order.customer_tier)
    .bind(&order.created_by)
    .bind(order.total_amount_cents)
    .bind(order.discount_cents)
    .bind(order.net_payable_cents)
    .bind(order.payment.amount_paid_cents)
    .bind(order.payment.balance_remaining_cents)
    .bind(order.payment.payment_status)
    .bind(order.status)
    .bind(&order.special_instructions)
    .bind(order.created_at)
    .bind(order.updated_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Rewrites every header column that can change after creation.
pub(crate) async fn update_header_in(conn: &mut SqliteConnection, order: &Order) -> DbResult<()> {
    sqlx::query(
        r#"
        UPDATE orders SET
            total_amount_cents = ?2,
            discount_cents = ?3,
            net_payable_cents = ?4,
            amount_paid_cents = ?5,
            balance_remaining_cents = ?6,
            payment_status = ?7,
            status = ?8,
            special_instructions = ?9,
            updated_at = ?10
        WHERE id = ?1
        "#,
    )
    .bind(&order.id)
    .bind(order.total_amount_cents)
    .bind(order.discount_cents)
    .bind(order.net_payable_cents)
    .bind(order.payment.amount_paid_cents)
    .bind(order.payment.balance_remaining_cents)
    .bind(order.payment.payment_status)
    .bind(order.status)
    .bind(&order.special_instructions)
    .bind(order.updated_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub(crate) async fn insert_history_in(
    conn: &mut SqliteConnection,
    order_id: &str,
    entries: &[StatusChange],
) -> DbResult<()> {
    for entry in entries {
        sqlx::query(
            "INSERT INTO order_status_history (order_id, status, changed_at) VALUES (?1, ?2, ?3)",
        )
        .bind(order_id)
        .bind(entry.status)
        .bind(entry.changed_at)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

/// Persists priced lines in order, numbering them from 1.
pub(crate) async fn insert_items_in(
    conn: &mut SqliteConnection,
    order_id: &str,
    lines: &[PricedLine],
    now: DateTime<Utc>,
) -> DbResult<Vec<OrderItem>> {
    let mut items = Vec::with_capacity(lines.len());

    for (idx, line) in lines.iter().enumerate() {
        let item = OrderItem {
            id: new_id(),
            order_id: order_id.to_string(),
            product_id: line.product_id.clone(),
            product_name: line.product_name.clone(),
            quantity: line.quantity,
            unit_price_cents: line.unit_price.cents(),
            total_price_cents: line.total_price.cents(),
            line_no: idx as i64 + 1,
            created_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO order_items (
                id, order_id, product_id, product_name, quantity,
                unit_price_cents, total_price_cents, line_no, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&item.id)
        .bind(&item.order_id)
        .bind(&item.product_id)
        .bind(&item.product_name)
        .bind(item.quantity)
        .bind(item.unit_price_cents)
        .bind(item.total_price_cents)
        .bind(item.line_no)
        .bind(item.created_at)
        .execute(&mut *conn)
        .await?;

        items.push(item);
    }

    Ok(items)
}

pub(crate) async fn delete_items_in(conn: &mut SqliteConnection, order_id: &str) -> DbResult<u64> {
    let result = sqlx::query("DELETE FROM order_items WHERE order_id = ?1")
        .bind(order_id)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected())
}

pub(crate) async fn insert_payment_in(
    conn: &mut SqliteConnection,
    payment: &OrderPayment,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO order_payments (
            id, order_id, kind, amount_cents, amount_paid_after_cents, recorded_by, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(&payment.id)
    .bind(&payment.order_id)
    .bind(payment.kind)
    .bind(payment.amount_cents)
    .bind(payment.amount_paid_after_cents)
    .bind(&payment.recorded_by)
    .bind(payment.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Deletes the header; items, history and payments cascade.
pub(crate) async fn delete_in(conn: &mut SqliteConnection, id: &str) -> DbResult<u64> {
    let result = sqlx::query("DELETE FROM orders WHERE id = ?1")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected())
}
