//! # Reports
//!
//! Read-only aggregations over products, stock history, orders and
//! expenses. Nothing here writes.
//!
//! ## Money in reports
//! Sums are computed in SQL on the `*_cents` columns and returned as
//! [`Money`]. Percentages and average days are the only floating point
//! values.
//!
//! ## Receivables
//! ```text
//! non-cancelled orders with balance_remaining > 0
//!        │
//!        ├──► outstanding_invoices      one row per order, oldest first
//!        ├──► receivables_aging         0-30 │ 31-60 │ 61-90 │ 90+ days
//!        └──► high_due_customers        per-customer due >= threshold
//! ```

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use sqlx::{FromRow, SqlitePool};
use tracing::debug;

use tarpal_core::{CustomerTier, ExpenseCategory, Money, OrderStatus, PaymentStatus, Product};

use crate::error::DbResult;

// =============================================================================
// Report Shapes
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, FromRow)]
pub struct InventoryOverview {
    pub total_products: i64,
    pub total_stock: i64,
    /// `0 < stock < threshold`
    pub low_stock: i64,
    pub out_of_stock: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, FromRow)]
pub struct OrderSnapshot {
    pub total: i64,
    pub pending: i64,
    pub processing: i64,
    pub completed: i64,
    pub cancelled: i64,
}

/// Added vs reduced quantity for one calendar day (UTC).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct DailyStockActivity {
    /// `YYYY-MM-DD`
    pub day: String,
    pub added: i64,
    pub reduced: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct ProductActivity {
    pub product_id: String,
    pub product_name: String,
    pub updates: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct PaymentStatusCount {
    pub payment_status: PaymentStatus,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentSummary {
    /// Paid so far on `Processing` and `Completed` orders.
    pub total_collected: Money,
    /// Unpaid remainder of every non-cancelled order.
    pub outstanding: Money,
    /// Paid over payable across non-cancelled orders, two decimals.
    pub recovery_percent: f64,
    pub status_distribution: Vec<PaymentStatusCount>,
    pub total_discount: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopSeller {
    pub product_id: String,
    pub product_name: String,
    pub units_sold: i64,
    pub revenue: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExpenseTotal {
    pub category: ExpenseCategory,
    pub total: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExpenseBreakdown {
    pub by_category: Vec<ExpenseTotal>,
    pub total_expenses: Money,
    pub revenue: Money,
    /// `revenue - total_expenses`, may be negative.
    pub net: Money,
}

/// An order with money still owed on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutstandingInvoice {
    pub order_id: String,
    pub order_code: String,
    pub customer_id: String,
    pub customer_name: Option<String>,
    pub customer_tier: CustomerTier,
    pub order_date: DateTime<Utc>,
    pub total_amount: Money,
    pub net_payable: Money,
    pub due: Money,
    pub payment_status: PaymentStatus,
    pub status: OrderStatus,
}

/// Age bands of receivables, by days since the order was placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AgeRange {
    #[serde(rename = "0-30")]
    UpTo30,
    #[serde(rename = "31-60")]
    UpTo60,
    #[serde(rename = "61-90")]
    UpTo90,
    #[serde(rename = "90+")]
    Over90,
}

impl AgeRange {
    pub const ALL: [AgeRange; 4] = [
        AgeRange::UpTo30,
        AgeRange::UpTo60,
        AgeRange::UpTo90,
        AgeRange::Over90,
    ];

    pub fn for_age(days: i64) -> Self {
        match days {
            d if d <= 30 => AgeRange::UpTo30,
            d if d <= 60 => AgeRange::UpTo60,
            d if d <= 90 => AgeRange::UpTo90,
            _ => AgeRange::Over90,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AgeRange::UpTo30 => "0-30",
            AgeRange::UpTo60 => "31-60",
            AgeRange::UpTo90 => "61-90",
            AgeRange::Over90 => "90+",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgingBucket {
    pub range: AgeRange,
    pub count: i64,
    pub amount: Money,
}

/// Average days from order to full payment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DaysSalesOutstanding {
    pub average_days: f64,
    pub sample_size: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustomerDue {
    pub customer_id: String,
    pub name: String,
    pub tier: CustomerTier,
    pub total_due: Money,
    pub order_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomerPaymentBehavior {
    pub customer_id: String,
    pub name: String,
    pub tier: CustomerTier,
    pub total_orders: i64,
    pub total_payable: Money,
    pub total_paid: Money,
    pub total_due: Money,
    pub recovery_percent: f64,
}

#[derive(FromRow)]
struct OutstandingRow {
    id: String,
    order_code: String,
    customer_id: String,
    customer_name: Option<String>,
    customer_tier: CustomerTier,
    created_at: DateTime<Utc>,
    total_amount_cents: i64,
    net_payable_cents: i64,
    balance_remaining_cents: i64,
    payment_status: PaymentStatus,
    status: OrderStatus,
}

#[derive(FromRow)]
struct CustomerDueRow {
    customer_id: String,
    name: String,
    tier: CustomerTier,
    total_due_cents: i64,
    order_count: i64,
}

#[derive(FromRow)]
struct BehaviorRow {
    customer_id: String,
    name: String,
    tier: CustomerTier,
    total_orders: i64,
    payable_cents: i64,
    paid_cents: i64,
}

#[derive(FromRow)]
struct PaymentTotals {
    collected: i64,
    outstanding: i64,
    payable: i64,
    paid: i64,
    discount: i64,
}

#[derive(FromRow)]
struct TopSellerRow {
    product_id: String,
    product_name: String,
    units_sold: i64,
    revenue_cents: i64,
}

#[derive(FromRow)]
struct ExpenseTotalRow {
    category: ExpenseCategory,
    total_cents: i64,
}

// =============================================================================
// Reports
// =============================================================================

#[derive(Debug, Clone)]
pub struct Reports {
    pool: SqlitePool,
}

impl Reports {
    pub fn new(pool: SqlitePool) -> Self {
        Reports { pool }
    }

    pub async fn inventory_overview(&self, low_threshold: i64) -> DbResult<InventoryOverview> {
        let overview = sqlx::query_as::<_, InventoryOverview>(
            r#"
            SELECT
                COUNT(*)                                                      AS total_products,
                COALESCE(SUM(stock), 0)                                       AS total_stock,
                COALESCE(SUM(CASE WHEN stock > 0 AND stock < ?1 THEN 1 ELSE 0 END), 0) AS low_stock,
                COALESCE(SUM(CASE WHEN stock = 0 THEN 1 ELSE 0 END), 0)       AS out_of_stock
            FROM products
            "#,
        )
        .bind(low_threshold)
        .fetch_one(&self.pool)
        .await?;
        Ok(overview)
    }

    /// Order counts per lifecycle status.
    pub async fn order_snapshot(&self) -> DbResult<OrderSnapshot> {
        let rows = sqlx::query_as::<_, (OrderStatus, i64)>(
            "SELECT status, COUNT(*) FROM orders GROUP BY status",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut snapshot = OrderSnapshot::default();
        for (status, count) in rows {
            snapshot.total += count;
            match status {
                OrderStatus::Pending => snapshot.pending = count,
                OrderStatus::Processing => snapshot.processing = count,
                OrderStatus::Completed => snapshot.completed = count,
                OrderStatus::Cancelled => snapshot.cancelled = count,
            }
        }
        Ok(snapshot)
    }

    /// In-stock products below `threshold`, scarcest first.
    pub async fn low_stock_products(&self, threshold: i64) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            "SELECT * FROM products WHERE stock > 0 AND stock < ?1 ORDER BY stock ASC, name",
        )
        .bind(threshold)
        .fetch_all(&self.pool)
        .await?;
        Ok(products)
    }

    /// Per-day stock movement over the last `days` days, oldest day first.
    pub async fn stock_activity(&self, days: u32) -> DbResult<Vec<DailyStockActivity>> {
        let since = Utc::now() - Duration::days(i64::from(days));
        debug!(%since, "Stock activity window");

        let rows = sqlx::query_as::<_, DailyStockActivity>(
            r#"
            SELECT
                substr(created_at, 1, 10)                                       AS day,
                COALESCE(SUM(CASE WHEN action = 'add' THEN quantity ELSE 0 END), 0)    AS added,
                COALESCE(SUM(CASE WHEN action = 'reduce' THEN quantity ELSE 0 END), 0) AS reduced
            FROM stock_history
            WHERE created_at >= ?1
            GROUP BY day
            ORDER BY day ASC
            "#,
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Products with the most ledger entries.
    pub async fn most_updated_products(&self, limit: u32) -> DbResult<Vec<ProductActivity>> {
        let rows = sqlx::query_as::<_, ProductActivity>(
            r#"
            SELECT product_id, MAX(product_name) AS product_name, COUNT(*) AS updates
            FROM stock_history
            GROUP BY product_id
            ORDER BY updates DESC, product_name ASC
            LIMIT ?1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn payment_summary(&self) -> DbResult<PaymentSummary> {
        let totals = sqlx::query_as::<_, PaymentTotals>(
            r#"
            SELECT
                COALESCE(SUM(CASE WHEN status IN ('Processing', 'Completed') AND amount_paid_cents > 0
                                  THEN amount_paid_cents ELSE 0 END), 0)           AS collected,
                COALESCE(SUM(CASE WHEN status != 'Cancelled' AND balance_remaining_cents > 0
                                  THEN balance_remaining_cents ELSE 0 END), 0)     AS outstanding,
                COALESCE(SUM(CASE WHEN status != 'Cancelled' AND net_payable_cents > 0
                                  THEN net_payable_cents ELSE 0 END), 0)           AS payable,
                COALESCE(SUM(CASE WHEN status != 'Cancelled' AND net_payable_cents > 0
                                  THEN amount_paid_cents ELSE 0 END), 0)           AS paid,
                COALESCE(SUM(CASE WHEN status != 'Cancelled'
                                  THEN discount_cents ELSE 0 END), 0)              AS discount
            FROM orders
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        let status_distribution = sqlx::query_as::<_, PaymentStatusCount>(
            r#"
            SELECT payment_status, COUNT(*) AS count
            FROM orders
            WHERE status != 'Cancelled' AND net_payable_cents > 0
            GROUP BY payment_status
            ORDER BY payment_status
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(PaymentSummary {
            total_collected: Money::from_cents(totals.collected),
            outstanding: Money::from_cents(totals.outstanding),
            recovery_percent: recovery_percent(totals.paid, totals.payable),
            status_distribution,
            total_discount: Money::from_cents(totals.discount),
        })
    }

    /// Best sellers by units over non-cancelled orders.
    pub async fn top_selling_products(&self, limit: u32) -> DbResult<Vec<TopSeller>> {
        let rows = sqlx::query_as::<_, TopSellerRow>(
            r#"
            SELECT
                oi.product_id,
                MAX(oi.product_name)     AS product_name,
                SUM(oi.quantity)         AS units_sold,
                SUM(oi.total_price_cents) AS revenue_cents
            FROM order_items oi
            JOIN orders o ON o.id = oi.order_id
            WHERE o.status != 'Cancelled'
            GROUP BY oi.product_id
            ORDER BY units_sold DESC, revenue_cents DESC
            LIMIT ?1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| TopSeller {
                product_id: r.product_id,
                product_name: r.product_name,
                units_sold: r.units_sold,
                revenue: Money::from_cents(r.revenue_cents),
            })
            .collect())
    }

    /// Expense totals per category against collected revenue.
    pub async fn expense_breakdown(&self) -> DbResult<ExpenseBreakdown> {
        let rows = sqlx::query_as::<_, ExpenseTotalRow>(
            r#"
            SELECT category, SUM(amount_cents) AS total_cents
            FROM expenses
            GROUP BY category
            ORDER BY total_cents DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let revenue: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(amount_paid_cents), 0)
            FROM orders
            WHERE status IN ('Processing', 'Completed')
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        let by_category: Vec<ExpenseTotal> = rows
            .into_iter()
            .map(|r| ExpenseTotal {
                category: r.category,
                total: Money::from_cents(r.total_cents),
            })
            .collect();
        let total_expenses = by_category
            .iter()
            .fold(Money::zero(), |acc, e| acc + e.total);
        let revenue = Money::from_cents(revenue);

        Ok(ExpenseBreakdown {
            by_category,
            total_expenses,
            revenue,
            net: revenue - total_expenses,
        })
    }

    // =========================================================================
    // Receivables
    // =========================================================================

    /// Non-cancelled orders with a positive balance, oldest first.
    pub async fn outstanding_invoices(&self) -> DbResult<Vec<OutstandingInvoice>> {
        let rows = sqlx::query_as::<_, OutstandingRow>(
            r#"
            SELECT
                o.id, o.order_code, o.customer_id, c.name AS customer_name,
                o.customer_tier, o.created_at, o.total_amount_cents,
                o.net_payable_cents, o.balance_remaining_cents,
                o.payment_status, o.status
            FROM orders o
            LEFT JOIN customers c ON c.id = o.customer_id
            WHERE o.status != 'Cancelled' AND o.balance_remaining_cents > 0
            ORDER BY o.created_at ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| OutstandingInvoice {
                order_id: r.id,
                order_code: r.order_code,
                customer_id: r.customer_id,
                customer_name: r.customer_name,
                customer_tier: r.customer_tier,
                order_date: r.created_at,
                total_amount: Money::from_cents(r.total_amount_cents),
                net_payable: Money::from_cents(r.net_payable_cents),
                due: Money::from_cents(r.balance_remaining_cents),
                payment_status: r.payment_status,
                status: r.status,
            })
            .collect())
    }

    /// Outstanding balances bucketed by order age as of `as_of`.
    ///
    /// Every band is present, empty ones with zero count and amount.
    pub async fn receivables_aging(&self, as_of: DateTime<Utc>) -> DbResult<Vec<AgingBucket>> {
        let open = self.outstanding_invoices().await?;

        let mut buckets: Vec<AgingBucket> = AgeRange::ALL
            .iter()
            .map(|range| AgingBucket {
                range: *range,
                count: 0,
                amount: Money::zero(),
            })
            .collect();
        for invoice in &open {
            let range = AgeRange::for_age((as_of - invoice.order_date).num_days());
            if let Some(bucket) = buckets.iter_mut().find(|b| b.range == range) {
                bucket.count += 1;
                bucket.amount += invoice.due;
            }
        }
        debug!(%as_of, open = open.len(), "Receivables aged");
        Ok(buckets)
    }

    /// Average whole days between placing and last updating fully paid
    /// orders.
    pub async fn days_sales_outstanding(&self) -> DbResult<DaysSalesOutstanding> {
        let rows = sqlx::query_as::<_, (DateTime<Utc>, DateTime<Utc>)>(
            "SELECT created_at, updated_at FROM orders WHERE payment_status = 'Paid'",
        )
        .fetch_all(&self.pool)
        .await?;

        let days: Vec<i64> = rows
            .iter()
            .map(|(created, updated)| (*updated - *created).num_days())
            .collect();
        Ok(DaysSalesOutstanding {
            average_days: average_days(&days),
            sample_size: days.len() as i64,
        })
    }

    /// Customers owing at least `threshold` across non-cancelled orders,
    /// largest due first.
    pub async fn high_due_customers(&self, threshold: Money) -> DbResult<Vec<CustomerDue>> {
        let rows = sqlx::query_as::<_, CustomerDueRow>(
            r#"
            SELECT
                c.id                            AS customer_id,
                c.name,
                c.tier,
                SUM(o.balance_remaining_cents)  AS total_due_cents,
                COUNT(*)                        AS order_count
            FROM orders o
            JOIN customers c ON c.id = o.customer_id
            WHERE o.status != 'Cancelled' AND o.balance_remaining_cents > 0
            GROUP BY c.id
            HAVING SUM(o.balance_remaining_cents) >= ?1
            ORDER BY total_due_cents DESC, c.name ASC
            "#,
        )
        .bind(threshold.cents())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| CustomerDue {
                customer_id: r.customer_id,
                name: r.name,
                tier: r.tier,
                total_due: Money::from_cents(r.total_due_cents),
                order_count: r.order_count,
            })
            .collect())
    }

    /// Per-customer ordering and paying totals over non-cancelled orders,
    /// biggest payers first.
    pub async fn customer_payment_behavior(
        &self,
        limit: u32,
    ) -> DbResult<Vec<CustomerPaymentBehavior>> {
        let rows = sqlx::query_as::<_, BehaviorRow>(
            r#"
            SELECT
                c.id                        AS customer_id,
                c.name,
                c.tier,
                COUNT(*)                    AS total_orders,
                SUM(o.net_payable_cents)    AS payable_cents,
                SUM(o.amount_paid_cents)    AS paid_cents
            FROM orders o
            JOIN customers c ON c.id = o.customer_id
            WHERE o.status != 'Cancelled'
            GROUP BY c.id
            ORDER BY paid_cents DESC, c.name ASC
            LIMIT ?1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| {
                let payable = Money::from_cents(r.payable_cents);
                let paid = Money::from_cents(r.paid_cents);
                CustomerPaymentBehavior {
                    customer_id: r.customer_id,
                    name: r.name,
                    tier: r.tier,
                    total_orders: r.total_orders,
                    total_payable: payable,
                    total_paid: paid,
                    total_due: payable - paid,
                    recovery_percent: recovery_percent(r.paid_cents, r.payable_cents),
                }
            })
            .collect())
    }
}

/// Mean of `days`, rounded to two decimals. Zero for no samples.
fn average_days(days: &[i64]) -> f64 {
    if days.is_empty() {
        return 0.0;
    }
    let raw = days.iter().sum::<i64>() as f64 / days.len() as f64;
    (raw * 100.0).round() / 100.0
}

/// `paid / payable * 100`, rounded to two decimals. Zero when nothing is
/// payable.
fn recovery_percent(paid_cents: i64, payable_cents: i64) -> f64 {
    if payable_cents <= 0 {
        return 0.0;
    }
    let raw = paid_cents as f64 / payable_cents as f64 * 100.0;
    (raw * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::CreateOrder;
    use crate::pool::{Database, DbConfig};
    use crate::repository::customer::NewCustomer;
    use crate::repository::expense::NewExpense;
    use crate::repository::product::NewProduct;
    use tarpal_core::{CustomerTier, OrderLine, StockAction};

    #[test]
    fn test_recovery_percent() {
        assert_eq!(recovery_percent(0, 0), 0.0);
        assert_eq!(recovery_percent(150, 300), 50.0);
        assert_eq!(recovery_percent(1, 3), 33.33);
    }

    #[tokio::test]
    async fn test_inventory_overview_counts() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let products = db.products();
        products.create(NewProduct::new("Empty", 100, 90)).await.unwrap();
        products.create(NewProduct::new("Scarce", 100, 90).stock(3)).await.unwrap();
        products.create(NewProduct::new("Plenty", 100, 90).stock(50)).await.unwrap();

        let overview = db.reports().inventory_overview(10).await.unwrap();
        assert_eq!(
            overview,
            InventoryOverview {
                total_products: 3,
                total_stock: 53,
                low_stock: 1,
                out_of_stock: 1,
            }
        );

        let low = db.reports().low_stock_products(10).await.unwrap();
        assert_eq!(low.len(), 1);
        assert_eq!(low[0].name, "Scarce");
    }

    #[tokio::test]
    async fn test_stock_activity_and_most_updated() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let product = db
            .products()
            .create(NewProduct::new("HDPE Sheet", 100, 90).stock(10))
            .await
            .unwrap();
        let ledger = db.stock();
        ledger
            .adjust_stock(&product.id, StockAction::Reduce, 4, None, None)
            .await
            .unwrap();
        ledger
            .adjust_stock(&product.id, StockAction::Add, 2, None, None)
            .await
            .unwrap();

        let activity = db.reports().stock_activity(7).await.unwrap();
        assert_eq!(activity.len(), 1);
        assert_eq!(activity[0].added, 12);
        assert_eq!(activity[0].reduced, 4);

        let most = db.reports().most_updated_products(5).await.unwrap();
        assert_eq!(most[0].product_id, product.id);
        assert_eq!(most[0].updates, 3);
    }

    #[tokio::test]
    async fn test_payment_summary_and_expenses() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let customer = db
            .customers()
            .create(NewCustomer {
                name: "Karim".to_string(),
                email: "karim@example.com".to_string(),
                phone: "+8801711000001".to_string(),
                tier: CustomerTier::Retailer,
                city: None,
            })
            .await
            .unwrap();
        let product = db
            .products()
            .create(NewProduct::new("PE Tarpaulin", 100_00, 80_00).stock(10))
            .await
            .unwrap();

        let engine = db.order_engine();
        engine
            .create_order(
                CreateOrder::new(&customer.id, vec![OrderLine::new(&product.id, 3)])
                    .amount_paid(Money::from_major(150)),
            )
            .await
            .unwrap();

        db.expenses()
            .create(NewExpense {
                title: "Tempo hire".to_string(),
                category: ExpenseCategory::Transport,
                amount_cents: 50_00,
                note: None,
                expense_date: None,
                added_by: None,
            })
            .await
            .unwrap();

        let summary = db.reports().payment_summary().await.unwrap();
        assert_eq!(summary.total_collected, Money::from_major(150));
        assert_eq!(summary.outstanding, Money::from_major(150));
        assert_eq!(summary.recovery_percent, 50.0);
        assert_eq!(summary.status_distribution.len(), 1);
        assert_eq!(
            summary.status_distribution[0].payment_status,
            PaymentStatus::PartiallyPaid
        );

        let top = db.reports().top_selling_products(5).await.unwrap();
        assert_eq!(top[0].units_sold, 3);
        assert_eq!(top[0].revenue, Money::from_major(300));

        let expenses = db.reports().expense_breakdown().await.unwrap();
        assert_eq!(expenses.total_expenses, Money::from_major(50));
        assert_eq!(expenses.net, Money::from_major(100));
    }

    #[test]
    fn test_age_ranges_and_average_days() {
        assert_eq!(AgeRange::for_age(-1), AgeRange::UpTo30);
        assert_eq!(AgeRange::for_age(30), AgeRange::UpTo30);
        assert_eq!(AgeRange::for_age(31), AgeRange::UpTo60);
        assert_eq!(AgeRange::for_age(90), AgeRange::UpTo90);
        assert_eq!(AgeRange::for_age(91).as_str(), "90+");

        assert_eq!(average_days(&[]), 0.0);
        assert_eq!(average_days(&[1, 2, 4]), 2.33);
    }

    async fn new_customer(db: &Database, name: &str, email: &str, tier: CustomerTier) -> String {
        db.customers()
            .create(NewCustomer {
                name: name.to_string(),
                email: email.to_string(),
                phone: "+91 98123 00000".to_string(),
                tier,
                city: None,
            })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_receivables_reports() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let sharma =
            new_customer(&db, "Sharma Traders", "sharma@example.com", CustomerTier::Wholesaler).await;
        let ravi = new_customer(&db, "Ravi Kumar", "ravi@example.com", CustomerTier::Retailer).await;
        let product = db
            .products()
            .create(NewProduct::new("PE Tarpaulin", 100_00, 80_00).stock(200))
            .await
            .unwrap();

        let engine = db.order_engine();
        // 100 x ₹80 with ₹1,000 paid: ₹7,000 due
        let big = engine
            .create_order(
                CreateOrder::new(&sharma, vec![OrderLine::new(&product.id, 100)])
                    .amount_paid(Money::from_major(1_000)),
            )
            .await
            .unwrap();
        // 3 x ₹100 unpaid
        let small = engine
            .create_order(CreateOrder::new(&ravi, vec![OrderLine::new(&product.id, 3)]))
            .await
            .unwrap();
        // paid in full
        engine
            .create_order(
                CreateOrder::new(&ravi, vec![OrderLine::new(&product.id, 2)])
                    .amount_paid(Money::from_major(200)),
            )
            .await
            .unwrap();
        // cancelled with a balance
        let dropped = engine
            .create_order(CreateOrder::new(&ravi, vec![OrderLine::new(&product.id, 1)]))
            .await
            .unwrap();
        engine.cancel_order(&dropped.id).await.unwrap();

        let reports = db.reports();

        let open = reports.outstanding_invoices().await.unwrap();
        assert_eq!(open.len(), 2);
        let big_row = open.iter().find(|i| i.order_id == big.id).unwrap();
        assert_eq!(big_row.customer_name.as_deref(), Some("Sharma Traders"));
        assert_eq!(big_row.due, Money::from_major(7_000));
        assert_eq!(big_row.payment_status, PaymentStatus::PartiallyPaid);
        let small_row = open.iter().find(|i| i.order_id == small.id).unwrap();
        assert_eq!(small_row.due, Money::from_major(300));
        assert_eq!(small_row.payment_status, PaymentStatus::Unpaid);

        let today = reports.receivables_aging(Utc::now()).await.unwrap();
        assert_eq!(today.len(), 4);
        assert_eq!(today[0].range, AgeRange::UpTo30);
        assert_eq!(today[0].count, 2);
        assert_eq!(today[0].amount, Money::from_major(7_300));

        let later = reports
            .receivables_aging(Utc::now() + Duration::days(45))
            .await
            .unwrap();
        assert_eq!(later[0].count, 0);
        assert_eq!(later[1].range, AgeRange::UpTo60);
        assert_eq!(later[1].count, 2);
        assert_eq!(later[1].amount, Money::from_major(7_300));
        assert_eq!(later[3].amount, Money::zero());

        let dso = reports.days_sales_outstanding().await.unwrap();
        assert_eq!(dso.sample_size, 1);
        assert_eq!(dso.average_days, 0.0);

        let high = reports
            .high_due_customers(Money::from_cents(tarpal_core::DEFAULT_HIGH_DUE_CENTS))
            .await
            .unwrap();
        assert_eq!(high.len(), 1);
        assert_eq!(high[0].customer_id, sharma);
        assert_eq!(high[0].total_due, Money::from_major(7_000));

        let any_due = reports.high_due_customers(Money::from_major(100)).await.unwrap();
        assert_eq!(any_due.len(), 2);
        assert_eq!(any_due[1].customer_id, ravi);
        assert_eq!(any_due[1].total_due, Money::from_major(300));
        assert_eq!(any_due[1].order_count, 1);

        let behavior = reports.customer_payment_behavior(20).await.unwrap();
        assert_eq!(behavior.len(), 2);
        assert_eq!(behavior[0].customer_id, sharma);
        assert_eq!(behavior[0].recovery_percent, 12.5);
        assert_eq!(behavior[1].total_orders, 2);
        assert_eq!(behavior[1].total_payable, Money::from_major(500));
        assert_eq!(behavior[1].total_due, Money::from_major(300));
        assert_eq!(behavior[1].recovery_percent, 40.0);
    }
}
