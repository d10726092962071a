//! # Stock History Rows
//!
//! Append-only. Triggers in the schema reject UPDATE and DELETE, so the
//! only write here is [`insert_in`].

use sqlx::{SqliteConnection, SqlitePool};

use tarpal_core::StockHistoryEntry;

use crate::error::DbResult;

pub(crate) async fn insert_in(
    conn: &mut SqliteConnection,
    entry: &StockHistoryEntry,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO stock_history (
            id, product_id, product_name, action, quantity,
            previous_stock, new_stock, reason, reference_id,
            remarks, acting_user_id, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
        "#,
    )
    .bind(&entry.id)
    .bind(&entry.product_id)
    .bind(&entry.product_name)
    .bind(entry.action)
    .bind(entry.quantity)
    .bind(entry.previous_stock)
    .bind(entry.new_stock)
    .bind(entry.reason)
    .bind(&entry.reference_id)
    .bind(&entry.remarks)
    .bind(&entry.acting_user_id)
    .bind(entry.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Entries for one product, newest first.
pub async fn for_product(
    pool: &SqlitePool,
    product_id: &str,
    limit: u32,
) -> DbResult<Vec<StockHistoryEntry>> {
    let entries = sqlx::query_as::<_, StockHistoryEntry>(
        r#"
        SELECT * FROM stock_history
        WHERE product_id = ?1
        ORDER BY created_at DESC, rowid DESC
        LIMIT ?2
        "#,
    )
    .bind(product_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(entries)
}

/// Latest entries across all products.
pub async fn recent(pool: &SqlitePool, limit: u32) -> DbResult<Vec<StockHistoryEntry>> {
    let entries = sqlx::query_as::<_, StockHistoryEntry>(
        "SELECT * FROM stock_history ORDER BY created_at DESC, rowid DESC LIMIT ?1",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(entries)
}

/// Entries written on behalf of one order (creation, approval or
/// reconciled item replacement).
pub async fn for_reference(
    pool: &SqlitePool,
    reference_id: &str,
) -> DbResult<Vec<StockHistoryEntry>> {
    let entries = sqlx::query_as::<_, StockHistoryEntry>(
        "SELECT * FROM stock_history WHERE reference_id = ?1 ORDER BY rowid",
    )
    .bind(reference_id)
    .fetch_all(pool)
    .await?;

    Ok(entries)
}
