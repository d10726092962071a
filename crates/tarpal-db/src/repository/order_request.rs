//! # Order Request Rows
//!
//! Requests and their unpriced `(product, quantity)` lines. Writes are
//! transactional helpers used by the request queue.

use serde::{Deserialize, Serialize};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};

use tarpal_core::{OrderLine, OrderRequest, Page, PageRequest, RequestStatus, SortOrder};

use crate::error::{DbError, DbResult};
use crate::repository::page_of;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequestFilter {
    pub status: Option<RequestStatus>,
    #[serde(default)]
    pub sort: SortOrder,
}

pub(crate) async fn insert_in(conn: &mut SqliteConnection, request: &OrderRequest) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO order_requests (
            id, customer_id, status, customer_note, special_instructions,
            decision_note, decided_by, decided_at, order_id, requested_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
        "#,
    )
    .bind(&request.id)
    .bind(&request.customer_id)
    .bind(request.status)
    .bind(&request.customer_note)
    .bind(&request.special_instructions)
    .bind(&request.decision_note)
    .bind(&request.decided_by)
    .bind(request.decided_at)
    .bind(&request.order_id)
    .bind(request.requested_at)
    .bind(request.updated_at)
    .execute(&mut *conn)
    .await?;

    for line in &request.items {
        sqlx::query(
            "INSERT INTO order_request_items (request_id, product_id, quantity) VALUES (?1, ?2, ?3)",
        )
        .bind(&request.id)
        .bind(&line.product_id)
        .bind(line.quantity)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

/// Request with its lines, in submission order.
pub(crate) async fn find_in(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<OrderRequest>> {
    let request = sqlx::query_as::<_, OrderRequest>("SELECT * FROM order_requests WHERE id = ?1")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    let Some(mut request) = request else {
        return Ok(None);
    };
    request.items = lines_in(conn, id).await?;
    Ok(Some(request))
}

async fn lines_in(conn: &mut SqliteConnection, request_id: &str) -> DbResult<Vec<OrderLine>> {
    let lines = sqlx::query_as::<_, OrderLine>(
        "SELECT product_id, quantity FROM order_request_items WHERE request_id = ?1 ORDER BY seq",
    )
    .bind(request_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(lines)
}

/// Persists a decision. Only a `Pending` row is touched, so a decision
/// can never overwrite another.
///
/// ## Returns
/// `false` if the row was no longer pending.
pub(crate) async fn update_decision_in(
    conn: &mut SqliteConnection,
    request: &OrderRequest,
) -> DbResult<bool> {
    let result = sqlx::query(
        r#"
        UPDATE order_requests SET
            status = ?2,
            decision_note = ?3,
            decided_by = ?4,
            decided_at = ?5,
            order_id = ?6,
            updated_at = ?7
        WHERE id = ?1 AND status = 'Pending'
        "#,
    )
    .bind(&request.id)
    .bind(request.status)
    .bind(&request.decision_note)
    .bind(&request.decided_by)
    .bind(request.decided_at)
    .bind(&request.order_id)
    .bind(request.updated_at)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

pub async fn get(pool: &SqlitePool, id: &str) -> DbResult<Option<OrderRequest>> {
    let mut conn = pool.acquire().await?;
    find_in(&mut conn, id).await
}

/// Paginated listing with lines loaded.
pub async fn list(
    pool: &SqlitePool,
    filter: &RequestFilter,
    page: PageRequest,
) -> DbResult<Page<OrderRequest>> {
    let mut conn = pool.acquire().await?;

    let mut count_qb: QueryBuilder<'_, Sqlite> =
        QueryBuilder::new("SELECT COUNT(*) FROM order_requests WHERE 1 = 1");
    if let Some(status) = filter.status {
        count_qb.push(" AND status = ").push_bind(status);
    }
    let total = count_qb
        .build_query_scalar::<i64>()
        .fetch_one(&mut *conn)
        .await
        .map_err(DbError::from)?;

    let mut qb: QueryBuilder<'_, Sqlite> =
        QueryBuilder::new("SELECT * FROM order_requests WHERE 1 = 1");
    if let Some(status) = filter.status {
        qb.push(" AND status = ").push_bind(status);
    }
    let dir = filter.sort.sql();
    qb.push(format!(" ORDER BY requested_at {dir}, rowid {dir} LIMIT "))
        .push_bind(page.limit)
        .push(" OFFSET ")
        .push_bind(page.offset());

    let mut requests = qb
        .build_query_as::<OrderRequest>()
        .fetch_all(&mut *conn)
        .await
        .map_err(DbError::from)?;

    for request in &mut requests {
        request.items = lines_in(&mut conn, &request.id).await?;
    }

    Ok(page_of(requests, total, page))
}
