//! # Order Engine
//!
//! Creation, edits, payments, cancellation and deletion of orders.
//!
//! ## Creation Protocol
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    create_order (one transaction)                       │
//! │                                                                         │
//! │  1. customer exists?                     ── no ─► CustomerNotFound      │
//! │  2. every product exists?                ── no ─► ProductNotFound       │
//! │  3. stock >= demand, per product         ── no ─► InsufficientStock     │
//! │     (duplicate lines summed first)                                      │
//! │  ─────────────── nothing written above this line ───────────────        │
//! │  4. price each line with the customer's tier                            │
//! │  5. Order::create (totals, clamp, status, history)                      │
//! │  6. insert header (retry on order code collision)                       │
//! │  7. insert items + history                                              │
//! │  8. ledger reduce per product (reason order_fulfillment)                │
//! │  9. commit                                                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Edit vs Payment
//! - [`OrderEngine::update_order`] overwrites `amount_paid` (data
//!   correction) and may replace items.
//! - [`OrderEngine::record_payment`] adds to `amount_paid`.
//!
//! Both log a row in `order_payments` with the kind of change.

use std::collections::HashMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

use tarpal_core::order::{check_requested_status, generate_order_code, NewOrder};
use tarpal_core::pricing::lines_total;
use tarpal_core::stock::{aggregate_demand, quantity_deltas};
use tarpal_core::validation::validate_lines;
use tarpal_core::{
    CoreError, CoreResult, CustomerTier, ItemReplacementStock, Money, Order, OrderCreated,
    OrderDetails, OrderLine, OrderPayment, OrderStatus, PaymentKind, PricedLine, Product,
    StockAction, StockReason, TierPolicy,
};

use crate::config::EngineConfig;
use crate::engine::ledger::{self, StockMovement};
use crate::engine::StockGate;
use crate::error::{DbError, EngineResult};
use crate::repository::{customer, new_id, order as orders, product};

// =============================================================================
// Inputs / Outputs
// =============================================================================

/// A staff-entered order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrder {
    pub customer_id: String,
    pub lines: Vec<OrderLine>,
    #[serde(default)]
    pub discount: Money,
    #[serde(default)]
    pub initial_amount_paid: Money,
    pub special_instructions: Option<String>,
    pub created_by: Option<String>,
}

impl CreateOrder {
    pub fn new(customer_id: impl Into<String>, lines: Vec<OrderLine>) -> Self {
        CreateOrder {
            customer_id: customer_id.into(),
            lines,
            discount: Money::zero(),
            initial_amount_paid: Money::zero(),
            special_instructions: None,
            created_by: None,
        }
    }

    pub fn discount(mut self, discount: Money) -> Self {
        self.discount = discount;
        self
    }

    pub fn amount_paid(mut self, amount: Money) -> Self {
        self.initial_amount_paid = amount;
        self
    }

    pub fn instructions(mut self, text: impl Into<String>) -> Self {
        self.special_instructions = Some(text.into());
        self
    }

    pub fn created_by(mut self, user_id: impl Into<String>) -> Self {
        self.created_by = Some(user_id.into());
        self
    }
}

/// Partial order edit. `None` leaves the field alone.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateOrder {
    /// Only `Cancelled` is accepted.
    pub status: Option<OrderStatus>,
    /// Replaces every line.
    pub items: Option<Vec<OrderLine>>,
    pub discount: Option<Money>,
    /// Absolute overwrite, capped at the new `net_payable`.
    pub amount_paid: Option<Money>,
    pub special_instructions: Option<String>,
}

/// Result of [`OrderEngine::record_payment`].
#[derive(Debug, Clone, Serialize)]
pub struct PaymentReceipt {
    pub order: Order,
    /// e.g. `Payment of ₹150.00 recorded successfully`
    pub message: String,
}

// =============================================================================
// Shared transactional steps
// =============================================================================

/// Loads every product named by `lines`. Missing ones fail the call.
pub(crate) async fn load_products_in(
    conn: &mut SqliteConnection,
    lines: &[OrderLine],
) -> EngineResult<HashMap<String, Product>> {
    let mut products = HashMap::new();
    for (product_id, _) in aggregate_demand(lines) {
        let product = product::find_in(conn, &product_id)
            .await?
            .ok_or_else(|| CoreError::ProductNotFound(product_id.clone()))?;
        products.insert(product_id, product);
    }
    Ok(products)
}

/// Checks summed demand per product against loaded stock.
pub(crate) fn check_stock(
    products: &HashMap<String, Product>,
    demand: &[(String, i64)],
) -> CoreResult<()> {
    for (product_id, requested) in demand {
        let product = products
            .get(product_id)
            .ok_or_else(|| CoreError::ProductNotFound(product_id.clone()))?;
        if !product.can_fulfil(*requested) {
            warn!(
                product_id = %product.id,
                available = product.stock,
                requested,
                "Insufficient stock"
            );
            return Err(CoreError::InsufficientStock {
                product_id: product.id.clone(),
                product_name: product.name.clone(),
                available: product.stock,
                requested: *requested,
            });
        }
    }
    Ok(())
}

/// Prices each line with `tier`, keeping line order.
pub(crate) fn price_lines(
    tier: CustomerTier,
    lines: &[OrderLine],
    products: &HashMap<String, Product>,
) -> CoreResult<Vec<PricedLine>> {
    lines
        .iter()
        .map(|line| -> CoreResult<PricedLine> {
            let product = products
                .get(&line.product_id)
                .ok_or_else(|| CoreError::ProductNotFound(line.product_id.clone()))?;
            Ok(PricedLine::new(tier, product, line.quantity)?)
        })
        .collect()
}

/// Builds and inserts a header, drawing a fresh order code until one is
/// free or `attempts` run out.
pub(crate) async fn insert_with_fresh_code_in<F>(
    conn: &mut SqliteConnection,
    attempts: u32,
    build: F,
) -> EngineResult<Order>
where
    F: Fn(String) -> CoreResult<Order>,
{
    for attempt in 1..=attempts {
        let order = build(generate_order_code())?;
        match orders::insert_order_in(conn, &order).await {
            Ok(()) => return Ok(order),
            Err(e) if e.is_unique_violation_on("order_code") => {
                warn!(attempt, order_code = %order.order_code, "Order code collision, retrying");
            }
            Err(e) => return Err(e.into()),
        }
    }
    Err(CoreError::OrderCodeExhausted { attempts }.into())
}

/// Reduces stock for every product in `demand`, tagged with the order.
pub(crate) async fn commit_demand_in(
    conn: &mut SqliteConnection,
    demand: &[(String, i64)],
    reason: StockReason,
    order_id: &str,
    acting_user: Option<&String>,
) -> EngineResult<()> {
    for (product_id, quantity) in demand {
        let movement =
            StockMovement::for_order(product_id, StockAction::Reduce, *quantity, reason, order_id)
                .acting_user(acting_user.cloned());
        ledger::apply_in(conn, &movement).await?;
    }
    Ok(())
}

// =============================================================================
// OrderEngine
// =============================================================================

/// The order lifecycle engine.
///
/// ## Usage
/// ```rust,ignore
/// let engine = db.order_engine();
///
/// let created = engine
///     .create_order(CreateOrder::new(&customer_id, vec![OrderLine::new(&product_id, 3)]))
///     .await?;
///
/// let receipt = engine
///     .record_payment(&created.id, Money::from_major(150), None)
///     .await?;
/// ```
#[derive(Debug, Clone)]
pub struct OrderEngine {
    pool: SqlitePool,
    gate: StockGate,
    config: EngineConfig,
}

impl OrderEngine {
    pub fn new(pool: SqlitePool, gate: StockGate, config: EngineConfig) -> Self {
        OrderEngine { pool, gate, config }
    }

    /// Creates an order and commits its stock.
    ///
    /// On any error nothing is written: no order, no items, no stock
    /// movement.
    pub async fn create_order(&self, input: CreateOrder) -> EngineResult<OrderCreated> {
        validate_lines(&input.lines)?;

        let _guard = self.gate.lock().await;
        let mut tx = self.pool.begin().await.map_err(DbError::from)?;

        let customer = customer::find_in(&mut tx, &input.customer_id)
            .await?
            .ok_or_else(|| CoreError::CustomerNotFound(input.customer_id.clone()))?;

        let products = load_products_in(&mut tx, &input.lines).await?;
        let demand = aggregate_demand(&input.lines);
        check_stock(&products, &demand)?;

        let priced = price_lines(customer.tier, &input.lines, &products)?;
        let now = Utc::now();
        let order_id = new_id();

        let order = insert_with_fresh_code_in(&mut tx, self.config.order_code_attempts, |code| {
            Order::create(
                NewOrder {
                    id: order_id.clone(),
                    order_code: code,
                    customer_id: customer.id.clone(),
                    customer_tier: customer.tier,
                    created_by: input.created_by.clone(),
                    discount: input.discount,
                    initial_amount_paid: input.initial_amount_paid,
                    special_instructions: input.special_instructions.clone(),
                },
                &priced,
                now,
            )
        })
        .await?;

        orders::insert_items_in(&mut tx, &order.id, &priced, now).await?;
        orders::insert_history_in(&mut tx, &order.id, &order.status_history).await?;
        commit_demand_in(
            &mut tx,
            &demand,
            StockReason::OrderFulfillment,
            &order.id,
            input.created_by.as_ref(),
        )
        .await?;

        tx.commit().await.map_err(DbError::from)?;

        info!(
            order_id = %order.id,
            order_code = %order.order_code,
            customer_id = %order.customer_id,
            total = %order.total_amount(),
            status = %order.status,
            "Order created"
        );
        Ok(OrderCreated {
            id: order.id,
            order_code: order.order_code,
        })
    }

    /// Edits an order.
    ///
    /// ## Order of Application
    /// 1. `items`: replace every line, repriced with the tier chosen by
    ///    [`TierPolicy`]; stock follows [`ItemReplacementStock`]
    /// 2. `discount`: checked against the (new) total
    /// 3. `amount_paid`: absolute overwrite capped at the new net payable
    /// 4. `special_instructions`
    /// 5. recompute header and status
    /// 6. `status = Cancelled`: cancel last
    pub async fn update_order(
        &self,
        order_id: &str,
        update: UpdateOrder,
        actor: Option<String>,
    ) -> EngineResult<OrderDetails> {
        if let Some(status) = update.status {
            check_requested_status(status)?;
        }
        if let Some(items) = &update.items {
            validate_lines(items)?;
        }

        let moves_stock = update.items.is_some()
            && self.config.item_replacement_stock == ItemReplacementStock::Reconcile;
        let _guard = if moves_stock {
            Some(self.gate.lock().await)
        } else {
            None
        };

        let mut tx = self.pool.begin().await.map_err(DbError::from)?;

        let mut order = orders::find_in(&mut tx, order_id)
            .await?
            .ok_or_else(|| CoreError::OrderNotFound(order_id.to_string()))?;
        order.ensure_open().map_err(|e| {
            warn!(order_code = %order.order_code, "Edit refused on closed order");
            e
        })?;
        let history_before = order.status_history.len();
        let now = Utc::now();

        let mut total = order.total_amount();
        if let Some(items) = &update.items {
            total = self.replace_items_in(&mut tx, &order, items, now).await?;
        }
        let discount = update.discount.unwrap_or_else(|| order.discount());
        order.set_totals(total, discount)?;

        let mut overwrite = None;
        if let Some(amount) = update.amount_paid {
            order.set_amount_paid(amount)?;
            overwrite = Some(amount);
        }
        if let Some(text) = update.special_instructions {
            order.special_instructions = Some(text);
        }

        order.recompute(self.config.overpayment, now);
        if update.status == Some(OrderStatus::Cancelled) {
            order.cancel(now)?;
        }

        orders::update_header_in(&mut tx, &order).await?;
        orders::insert_history_in(&mut tx, &order.id, &order.status_history[history_before..])
            .await?;
        if let Some(amount) = overwrite {
            let entry = OrderPayment {
                id: new_id(),
                order_id: order.id.clone(),
                kind: PaymentKind::Overwrite,
                amount_cents: amount.cents(),
                amount_paid_after_cents: order.payment.amount_paid_cents,
                recorded_by: actor.clone(),
                created_at: now,
            };
            orders::insert_payment_in(&mut tx, &entry).await?;
        }

        let details = orders::details_in(&mut tx, &order.id)
            .await?
            .ok_or_else(|| CoreError::OrderNotFound(order.id.clone()))?;
        tx.commit().await.map_err(DbError::from)?;

        info!(
            order_code = %order.order_code,
            net_payable = %order.net_payable(),
            amount_paid = %order.payment.amount_paid(),
            status = %order.status,
            "Order updated"
        );
        Ok(details)
    }

    /// Deletes and recreates the order's lines. Returns the new line total.
    async fn replace_items_in(
        &self,
        conn: &mut SqliteConnection,
        order: &Order,
        items: &[OrderLine],
        now: chrono::DateTime<Utc>,
    ) -> EngineResult<Money> {
        let tier = match self.config.tier_policy {
            TierPolicy::Snapshot => order.customer_tier,
            TierPolicy::Current => {
                customer::find_in(conn, &order.customer_id)
                    .await?
                    .ok_or_else(|| CoreError::CustomerNotFound(order.customer_id.clone()))?
                    .tier
            }
        };

        let products = load_products_in(conn, items).await?;
        let priced = price_lines(tier, items, &products)?;
        let total = lines_total(&priced)?;

        if self.config.item_replacement_stock == ItemReplacementStock::Reconcile {
            let old: Vec<OrderLine> = orders::items_in(conn, &order.id)
                .await?
                .into_iter()
                .map(|item| OrderLine::new(item.product_id, item.quantity))
                .collect();
            let deltas = quantity_deltas(&old, items);

            let extra_demand: Vec<(String, i64)> =
                deltas.iter().filter(|(_, d)| *d > 0).cloned().collect();
            check_stock(&products, &extra_demand)?;

            for (product_id, delta) in deltas {
                let action = if delta > 0 {
                    StockAction::Reduce
                } else {
                    StockAction::Add
                };
                if action == StockAction::Add && product::find_in(conn, &product_id).await?.is_none()
                {
                    warn!(product_id = %product_id, "Removed line's product no longer exists, stock not returned");
                    continue;
                }
                let movement = StockMovement::for_order(
                    &product_id,
                    action,
                    delta.abs(),
                    StockReason::ItemReplacement,
                    &order.id,
                );
                ledger::apply_in(conn, &movement).await?;
            }
        }

        let removed = orders::delete_items_in(conn, &order.id).await?;
        orders::insert_items_in(conn, &order.id, &priced, now).await?;
        debug!(order_id = %order.id, removed, added = priced.len(), tier = %tier, "Order items replaced");

        Ok(total)
    }

    /// Adds a payment to the running total and re-derives status.
    pub async fn record_payment(
        &self,
        order_id: &str,
        amount: Money,
        recorded_by: Option<String>,
    ) -> EngineResult<PaymentReceipt> {
        let mut tx = self.pool.begin().await.map_err(DbError::from)?;

        let mut order = orders::find_in(&mut tx, order_id)
            .await?
            .ok_or_else(|| CoreError::OrderNotFound(order_id.to_string()))?;
        let history_before = order.status_history.len();
        let now = Utc::now();

        order
            .add_payment(amount, self.config.overpayment, now)
            .map_err(|e| {
                warn!(order_code = %order.order_code, amount = %amount, error = %e, "Payment refused");
                e
            })?;

        orders::update_header_in(&mut tx, &order).await?;
        orders::insert_history_in(&mut tx, &order.id, &order.status_history[history_before..])
            .await?;
        let entry = OrderPayment {
            id: new_id(),
            order_id: order.id.clone(),
            kind: PaymentKind::Increment,
            amount_cents: amount.cents(),
            amount_paid_after_cents: order.payment.amount_paid_cents,
            recorded_by,
            created_at: now,
        };
        orders::insert_payment_in(&mut tx, &entry).await?;

        tx.commit().await.map_err(DbError::from)?;

        info!(
            order_code = %order.order_code,
            amount = %amount,
            amount_paid = %order.payment.amount_paid(),
            status = %order.status,
            "Payment recorded"
        );
        Ok(PaymentReceipt {
            message: format!("Payment of {} recorded successfully", amount),
            order,
        })
    }

    /// Moves an order to `Cancelled`. Stock is not returned.
    pub async fn cancel_order(&self, order_id: &str) -> EngineResult<Order> {
        let mut tx = self.pool.begin().await.map_err(DbError::from)?;

        let mut order = orders::find_in(&mut tx, order_id)
            .await?
            .ok_or_else(|| CoreError::OrderNotFound(order_id.to_string()))?;
        let history_before = order.status_history.len();
        order.cancel(Utc::now())?;

        orders::update_header_in(&mut tx, &order).await?;
        orders::insert_history_in(&mut tx, &order.id, &order.status_history[history_before..])
            .await?;
        tx.commit().await.map_err(DbError::from)?;

        info!(order_code = %order.order_code, "Order cancelled");
        Ok(order)
    }

    /// Deletes an order with its items, history and payment log.
    pub async fn delete_order(&self, order_id: &str) -> EngineResult<()> {
        let mut tx = self.pool.begin().await.map_err(DbError::from)?;
        if orders::delete_in(&mut tx, order_id).await? == 0 {
            return Err(CoreError::OrderNotFound(order_id.to_string()).into());
        }
        tx.commit().await.map_err(DbError::from)?;

        info!(order_id = %order_id, "Order deleted");
        Ok(())
    }
}
