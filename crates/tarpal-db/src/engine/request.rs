//! # Order Request Queue
//!
//! Customers propose orders; an administrator approves or rejects them.
//!
//! ## Approval
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  approve(request_id)                     (one transaction, gated)      │
//! │       │                                                                 │
//! │       ├── request Pending?             ── no ─► RequestAlreadyDecided  │
//! │       ├── customer still exists?       ── no ─► CustomerNotFound       │
//! │       ├── products exist, stock enough ── no ─► error, request stays   │
//! │       │                                          Pending (retry later) │
//! │       ├── price lines, Order::from_approved_request → Processing       │
//! │       ├── insert order, items, history                                 │
//! │       ├── ledger reduce (reason request_approval)                      │
//! │       └── request → Approved, order_id set                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::{info, warn};

use tarpal_core::order::NewOrder;
use tarpal_core::stock::aggregate_demand;
use tarpal_core::{
    CoreError, Money, Order, OrderCreated, OrderLine, OrderRequest, Page, PageRequest,
    StockReason,
};

use crate::config::EngineConfig;
use crate::engine::order::{
    check_stock, commit_demand_in, insert_with_fresh_code_in, load_products_in, price_lines,
};
use crate::engine::StockGate;
use crate::error::{DbError, EngineResult};
use crate::repository::order_request::{self, RequestFilter};
use crate::repository::{customer, new_id, order as orders};

/// A customer's order proposal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitRequest {
    pub customer_id: String,
    pub items: Vec<OrderLine>,
    pub customer_note: Option<String>,
    pub special_instructions: Option<String>,
}

impl SubmitRequest {
    pub fn new(customer_id: impl Into<String>, items: Vec<OrderLine>) -> Self {
        SubmitRequest {
            customer_id: customer_id.into(),
            items,
            customer_note: None,
            special_instructions: None,
        }
    }

    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.customer_note = Some(note.into());
        self
    }
}

/// What a successful approval hands back.
#[derive(Debug, Clone, Serialize)]
pub struct Approval {
    pub request: OrderRequest,
    pub order: OrderCreated,
}

/// Submit / approve / reject order requests.
#[derive(Debug, Clone)]
pub struct RequestQueue {
    pool: SqlitePool,
    gate: StockGate,
    config: EngineConfig,
}

impl RequestQueue {
    pub fn new(pool: SqlitePool, gate: StockGate, config: EngineConfig) -> Self {
        RequestQueue { pool, gate, config }
    }

    /// Stores a new `Pending` request.
    ///
    /// Only the customer and the shape of the lines are checked. Products
    /// and stock are looked at on approval.
    pub async fn submit(&self, input: SubmitRequest) -> EngineResult<OrderRequest> {
        let request = OrderRequest::submit(
            new_id(),
            input.customer_id,
            input.items,
            input.customer_note,
            input.special_instructions,
            Utc::now(),
        )?;

        let mut tx = self.pool.begin().await.map_err(DbError::from)?;
        if customer::find_in(&mut tx, &request.customer_id).await?.is_none() {
            return Err(CoreError::CustomerNotFound(request.customer_id).into());
        }
        order_request::insert_in(&mut tx, &request).await?;
        tx.commit().await.map_err(DbError::from)?;

        info!(request_id = %request.id, lines = request.items.len(), "Order request submitted");
        Ok(request)
    }

    /// Approves a pending request, creating a `Processing` order and
    /// committing its stock.
    ///
    /// Any failure leaves the request `Pending` with no order and no stock
    /// change.
    pub async fn approve(
        &self,
        request_id: &str,
        decided_by: &str,
        decision_note: Option<String>,
    ) -> EngineResult<Approval> {
        let _guard = self.gate.lock().await;
        let mut tx = self.pool.begin().await.map_err(DbError::from)?;

        let mut request = order_request::find_in(&mut tx, request_id)
            .await?
            .ok_or_else(|| CoreError::OrderRequestNotFound(request_id.to_string()))?;
        request.ensure_pending().map_err(|e| {
            warn!(request_id = %request.id, status = %request.status, "Request already decided");
            e
        })?;

        let customer = customer::find_in(&mut tx, &request.customer_id)
            .await?
            .ok_or_else(|| CoreError::CustomerNotFound(request.customer_id.clone()))?;

        let products = load_products_in(&mut tx, &request.items).await?;
        let demand = aggregate_demand(&request.items);
        check_stock(&products, &demand).map_err(|e| {
            warn!(request_id = %request.id, "Approval refused, request stays pending");
            e
        })?;

        let priced = price_lines(customer.tier, &request.items, &products)?;
        let now = Utc::now();
        let order_id = new_id();

        let order = insert_with_fresh_code_in(&mut tx, self.config.order_code_attempts, |code| {
            Order::from_approved_request(
                NewOrder {
                    id: order_id.clone(),
                    order_code: code,
                    customer_id: customer.id.clone(),
                    customer_tier: customer.tier,
                    created_by: Some(decided_by.to_string()),
                    discount: Money::zero(),
                    initial_amount_paid: Money::zero(),
                    special_instructions: request.special_instructions.clone(),
                },
                &priced,
                now,
            )
        })
        .await?;

        orders::insert_items_in(&mut tx, &order.id, &priced, now).await?;
        orders::insert_history_in(&mut tx, &order.id, &order.status_history).await?;
        let actor = decided_by.to_string();
        commit_demand_in(
            &mut tx,
            &demand,
            StockReason::RequestApproval,
            &order.id,
            Some(&actor),
        )
        .await?;

        request.approve(actor, decision_note, order.id.clone(), now)?;
        if !order_request::update_decision_in(&mut tx, &request).await? {
            return Err(CoreError::RequestAlreadyDecided {
                request_id: request.id,
                status: "decided".to_string(),
            }
            .into());
        }

        tx.commit().await.map_err(DbError::from)?;

        info!(
            request_id = %request.id,
            order_code = %order.order_code,
            total = %order.total_amount(),
            "Order request approved"
        );
        Ok(Approval {
            request,
            order: OrderCreated {
                id: order.id,
                order_code: order.order_code,
            },
        })
    }

    /// Rejects a pending request. No stock or order side effects.
    pub async fn reject(
        &self,
        request_id: &str,
        decided_by: Option<String>,
        decision_note: Option<String>,
    ) -> EngineResult<OrderRequest> {
        let mut tx = self.pool.begin().await.map_err(DbError::from)?;

        let mut request = order_request::find_in(&mut tx, request_id)
            .await?
            .ok_or_else(|| CoreError::OrderRequestNotFound(request_id.to_string()))?;
        request
            .reject(decided_by, decision_note, Utc::now())
            .map_err(|e| {
                warn!(request_id = %request_id, error = %e, "Reject refused");
                e
            })?;

        if !order_request::update_decision_in(&mut tx, &request).await? {
            return Err(CoreError::RequestAlreadyDecided {
                request_id: request.id,
                status: "decided".to_string(),
            }
            .into());
        }
        tx.commit().await.map_err(DbError::from)?;

        info!(request_id = %request.id, "Order request rejected");
        Ok(request)
    }

    /// Request with its lines.
    pub async fn get(&self, request_id: &str) -> EngineResult<OrderRequest> {
        order_request::get(&self.pool, request_id)
            .await?
            .ok_or_else(|| CoreError::OrderRequestNotFound(request_id.to_string()).into())
    }

    pub async fn list(
        &self,
        filter: &RequestFilter,
        page: PageRequest,
    ) -> EngineResult<Page<OrderRequest>> {
        Ok(order_request::list(&self.pool, filter, page).await?)
    }
}
