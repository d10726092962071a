//! # Stock Ledger
//!
//! The only code that writes `products.stock`.
//!
//! ## Guarded Update
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  reduce 6 of "PE Tarpaulin" (stock 4)                                   │
//! │                                                                         │
//! │  UPDATE products                                                       │
//! │     SET stock = stock - 6, version = version + 1                       │
//! │   WHERE id = ? AND stock >= 6                                          │
//! │  RETURNING stock                                                       │
//! │       │                                                                 │
//! │       ├── row  → new stock, write stock_history                         │
//! │       └── none → InsufficientStock (stock untouched)                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Orders, request approvals, reconciled item edits and direct
//! adjustments all call [`apply_in`], so every movement leaves a history
//! row carrying its reason and (for order-driven movements) the order id.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

use tarpal_core::{
    CoreError, Product, StockAction, StockHistoryEntry, StockReason, ValidationError,
};

use crate::engine::StockGate;
use crate::error::{DbError, EngineResult};
use crate::repository::{new_id, product, stock_history};

/// One requested stock movement.
#[derive(Debug, Clone)]
pub struct StockMovement {
    pub product_id: String,
    pub action: StockAction,
    pub quantity: i64,
    pub reason: StockReason,
    /// Order id for order-driven movements.
    pub reference_id: Option<String>,
    pub remarks: Option<String>,
    pub acting_user_id: Option<String>,
}

impl StockMovement {
    /// A direct inventory adjustment by staff.
    pub fn adjustment(product_id: impl Into<String>, action: StockAction, quantity: i64) -> Self {
        StockMovement {
            product_id: product_id.into(),
            action,
            quantity,
            reason: StockReason::Adjustment,
            reference_id: None,
            remarks: None,
            acting_user_id: None,
        }
    }

    /// A movement caused by an order.
    pub fn for_order(
        product_id: impl Into<String>,
        action: StockAction,
        quantity: i64,
        reason: StockReason,
        order_id: &str,
    ) -> Self {
        StockMovement {
            product_id: product_id.into(),
            action,
            quantity,
            reason,
            reference_id: Some(order_id.to_string()),
            remarks: None,
            acting_user_id: None,
        }
    }

    pub fn remarks(mut self, remarks: Option<String>) -> Self {
        self.remarks = remarks;
        self
    }

    pub fn acting_user(mut self, user_id: Option<String>) -> Self {
        self.acting_user_id = user_id;
        self
    }
}

/// Shortage error matching the movement's origin.
fn shortage(movement: &StockMovement, product: &Product) -> CoreError {
    let (product_id, product_name) = (product.id.clone(), product.name.clone());
    match movement.reason {
        StockReason::Adjustment => CoreError::InsufficientStockToReduce {
            product_id,
            product_name,
            available: product.stock,
            requested: movement.quantity,
        },
        _ => CoreError::InsufficientStock {
            product_id,
            product_name,
            available: product.stock,
            requested: movement.quantity,
        },
    }
}

/// Applies one movement inside the caller's transaction.
///
/// The caller holds the [`StockGate`] and owns commit/rollback.
pub(crate) async fn apply_in(
    conn: &mut SqliteConnection,
    movement: &StockMovement,
) -> EngineResult<StockHistoryEntry> {
    if movement.quantity <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        }
        .into());
    }

    let product = product::find_in(conn, &movement.product_id)
        .await?
        .ok_or_else(|| CoreError::ProductNotFound(movement.product_id.clone()))?;

    let now = Utc::now();
    let sql = match movement.action {
        StockAction::Add => {
            r#"
            UPDATE products
               SET stock = stock + ?1, version = version + 1, updated_at = ?2
             WHERE id = ?3
            RETURNING stock
            "#
        }
        StockAction::Reduce => {
            r#"
            UPDATE products
               SET stock = stock - ?1, version = version + 1, updated_at = ?2
             WHERE id = ?3 AND stock >= ?1
            RETURNING stock
            "#
        }
    };

    let new_stock: Option<i64> = sqlx::query_scalar(sql)
        .bind(movement.quantity)
        .bind(now)
        .bind(&movement.product_id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(DbError::from)?;

    let Some(new_stock) = new_stock else {
        warn!(
            product_id = %product.id,
            available = product.stock,
            requested = movement.quantity,
            reason = ?movement.reason,
            "Stock reduction refused"
        );
        return Err(shortage(movement, &product).into());
    };

    let previous_stock = match movement.action {
        StockAction::Add => new_stock - movement.quantity,
        StockAction::Reduce => new_stock + movement.quantity,
    };

    let entry = StockHistoryEntry {
        id: new_id(),
        product_id: product.id,
        product_name: product.name,
        action: movement.action,
        quantity: movement.quantity,
        previous_stock,
        new_stock,
        reason: movement.reason,
        reference_id: movement.reference_id.clone(),
        remarks: movement.remarks.clone(),
        acting_user_id: movement.acting_user_id.clone(),
        created_at: now,
    };
    stock_history::insert_in(conn, &entry).await?;

    debug!(
        product_id = %entry.product_id,
        action = entry.action.as_str(),
        previous_stock,
        new_stock,
        "Stock moved"
    );
    Ok(entry)
}

// =============================================================================
// StockLedger
// =============================================================================

/// Direct inventory adjustments and ledger queries.
///
/// ## Usage
/// ```rust,ignore
/// let ledger = db.stock();
/// let entry = ledger
///     .adjust_stock(&product_id, "reduce".parse()?, 20, None, Some(user_id))
///     .await?;
/// ```
#[derive(Debug, Clone)]
pub struct StockLedger {
    pool: SqlitePool,
    gate: StockGate,
}

impl StockLedger {
    pub fn new(pool: SqlitePool, gate: StockGate) -> Self {
        StockLedger { pool, gate }
    }

    /// Applies a single movement in its own transaction.
    pub async fn apply(&self, movement: StockMovement) -> EngineResult<StockHistoryEntry> {
        let _guard = self.gate.lock().await;
        let mut tx = self.pool.begin().await.map_err(DbError::from)?;

        let entry = apply_in(&mut tx, &movement).await?;

        tx.commit().await.map_err(DbError::from)?;
        Ok(entry)
    }

    /// Adds or removes stock by hand.
    ///
    /// `reduce` needs `stock >= quantity`; otherwise nothing changes and
    /// no history row is written.
    pub async fn adjust_stock(
        &self,
        product_id: &str,
        action: StockAction,
        quantity: i64,
        remarks: Option<String>,
        acting_user_id: Option<String>,
    ) -> EngineResult<StockHistoryEntry> {
        let movement = StockMovement::adjustment(product_id, action, quantity)
            .remarks(remarks)
            .acting_user(acting_user_id);
        let entry = self.apply(movement).await?;

        info!(
            product_id = %entry.product_id,
            action = entry.action.as_str(),
            quantity = entry.quantity,
            new_stock = entry.new_stock,
            "Stock adjusted"
        );
        Ok(entry)
    }

    /// Ledger for one product, newest first.
    pub async fn history(&self, product_id: &str, limit: u32) -> EngineResult<Vec<StockHistoryEntry>> {
        Ok(stock_history::for_product(&self.pool, product_id, limit).await?)
    }

    /// Latest movements across the catalog.
    pub async fn recent(&self, limit: u32) -> EngineResult<Vec<StockHistoryEntry>> {
        Ok(stock_history::recent(&self.pool, limit).await?)
    }

    /// Movements recorded against one order.
    pub async fn for_order(&self, order_id: &str) -> EngineResult<Vec<StockHistoryEntry>> {
        Ok(stock_history::for_reference(&self.pool, order_id).await?)
    }
}
