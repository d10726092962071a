//! # Product Repository
//!
//! Database operations for products.
//!
//! ## Key Operations
//! - Creation with an auto-generated `TAR-NNN` SKU
//! - Filtered, paginated listing (category, stock bucket, search)
//! - Catalog edits (prices, name, unit, gsm, category)
//!
//! Stock is never written here. Opening stock on creation goes through
//! the stock ledger like every other movement.
//!
//! ## Listing Filters
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  stock_status      SQL                                                  │
//! │  ─────────────     ───────────────────────────                          │
//! │  in_stock          stock > 20                                           │
//! │  low_stock         stock BETWEEN 1 AND 20                               │
//! │  out_of_stock      stock = 0                                            │
//! │                                                                         │
//! │  search            name / sku / description LIKE %term%                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::{debug, info};

use tarpal_core::validation::{
    validate_amount_cents, validate_gsm, validate_name, validate_search_query,
};
use tarpal_core::{
    CoreError, Page, PageRequest, Product, ProductUnit, StockAction, StockStatus,
    LISTING_LOW_STOCK_MAX, MIN_GSM,
};

use crate::engine::ledger::{self, StockMovement};
use crate::engine::StockGate;
use crate::error::{DbError, DbResult, EngineResult};
use crate::repository::{category, like_pattern, new_id, page_of};

// =============================================================================
// Inputs
// =============================================================================

/// Fields for a new product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub description: Option<String>,
    /// `None` files the product under `Uncategorized`.
    pub category_id: Option<String>,
    pub price_retail_cents: i64,
    pub price_wholesale_cents: i64,
    /// Opening stock, recorded as a ledger `add`.
    pub stock: i64,
    pub unit: ProductUnit,
    pub gsm: i64,
}

impl NewProduct {
    pub fn new(name: impl Into<String>, price_retail_cents: i64, price_wholesale_cents: i64) -> Self {
        NewProduct {
            name: name.into(),
            description: None,
            category_id: None,
            price_retail_cents,
            price_wholesale_cents,
            stock: 0,
            unit: ProductUnit::default(),
            gsm: MIN_GSM,
        }
    }

    pub fn category(mut self, category_id: impl Into<String>) -> Self {
        self.category_id = Some(category_id.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn stock(mut self, stock: i64) -> Self {
        self.stock = stock;
        self
    }

    pub fn unit(mut self, unit: ProductUnit) -> Self {
        self.unit = unit;
        self
    }

    pub fn gsm(mut self, gsm: i64) -> Self {
        self.gsm = gsm;
        self
    }
}

/// Partial update. `None` leaves the field alone.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category_id: Option<String>,
    pub price_retail_cents: Option<i64>,
    pub price_wholesale_cents: Option<i64>,
    pub unit: Option<ProductUnit>,
    pub gsm: Option<i64>,
}

/// Listing filter. All fields are optional and combine with AND.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductFilter {
    pub category_id: Option<String>,
    pub stock_status: Option<StockStatus>,
    pub search: Option<String>,
}

impl ProductFilter {
    pub fn low_stock() -> Self {
        ProductFilter {
            stock_status: Some(StockStatus::LowStock),
            ..Default::default()
        }
    }

    fn push_where(&self, qb: &mut QueryBuilder<'_, Sqlite>, search: Option<String>) {
        qb.push(" WHERE 1 = 1");

        if let Some(category_id) = &self.category_id {
            qb.push(" AND category_id = ").push_bind(category_id.clone());
        }

        match self.stock_status {
            Some(StockStatus::InStock) => {
                qb.push(" AND stock > ").push_bind(LISTING_LOW_STOCK_MAX);
            }
            Some(StockStatus::LowStock) => {
                qb.push(" AND stock BETWEEN 1 AND ")
                    .push_bind(LISTING_LOW_STOCK_MAX);
            }
            Some(StockStatus::OutOfStock) => {
                qb.push(" AND stock = 0");
            }
            None => {}
        }

        if let Some(term) = search {
            let pattern = like_pattern(&term);
            qb.push(" AND (name LIKE ")
                .push_bind(pattern.clone())
                .push(" ESCAPE '\\' OR sku LIKE ")
                .push_bind(pattern.clone())
                .push(" ESCAPE '\\' OR description LIKE ")
                .push_bind(pattern)
                .push(" ESCAPE '\\')");
        }
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.products();
///
/// let product = repo
///     .create(NewProduct::new("PE Tarpaulin 12x18", 450_00, 380_00).stock(40))
///     .await?;
/// assert_eq!(product.sku, "TAR-001");
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
    gate: StockGate,
}

impl ProductRepository {
    pub fn new(pool: SqlitePool, gate: StockGate) -> Self {
        ProductRepository { pool, gate }
    }

    /// Creates a product.
    ///
    /// ## What This Does
    /// 1. Validates name, prices and gsm
    /// 2. Resolves the category (missing id → error, none → `Uncategorized`)
    /// 3. Allocates the next free `TAR-NNN` SKU
    /// 4. Inserts with zero stock, then records the opening stock through
    ///    the ledger
    pub async fn create(&self, new: NewProduct) -> EngineResult<Product> {
        validate_name("name", &new.name)?;
        validate_amount_cents("price_retail", new.price_retail_cents)?;
        validate_amount_cents("price_wholesale", new.price_wholesale_cents)?;
        validate_amount_cents("stock", new.stock)?;
        validate_gsm(new.gsm)?;

        let _guard = self.gate.lock().await;
        let mut tx = self.pool.begin().await.map_err(DbError::from)?;

        let category_id = match &new.category_id {
            Some(id) => {
                category::find_in(&mut tx, id)
                    .await?
                    .ok_or_else(|| CoreError::CategoryNotFound(id.clone()))?
                    .id
            }
            None => category::fallback_in(&mut tx).await?.id,
        };

        let sku = next_sku_in(&mut tx).await?;
        let now = Utc::now();
        let mut product = Product {
            id: new_id(),
            name: new.name.trim().to_string(),
            description: new.description,
            category_id,
            price_retail_cents: new.price_retail_cents,
            price_wholesale_cents: new.price_wholesale_cents,
            stock: 0,
            unit: new.unit,
            sku,
            gsm: new.gsm,
            version: 0,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO products (
                id, name, description, category_id,
                price_retail_cents, price_wholesale_cents,
                stock, unit, sku, gsm, version, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(&product.category_id)
        .bind(product.price_retail_cents)
        .bind(product.price_wholesale_cents)
        .bind(product.stock)
        .bind(product.unit)
        .bind(&product.sku)
        .bind(product.gsm)
        .bind(product.version)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(DbError::from)?;

        if new.stock > 0 {
            let movement = StockMovement::adjustment(&product.id, StockAction::Add, new.stock)
                .remarks(Some("Initial stock".to_string()));
            let entry = ledger::apply_in(&mut tx, &movement).await?;
            product.stock = entry.new_stock;
            product.version += 1;
        }

        tx.commit().await.map_err(DbError::from)?;
        info!(id = %product.id, sku = %product.sku, stock = product.stock, "Product created");
        Ok(product)
    }

    pub async fn get(&self, id: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(product)
    }

    pub async fn get_by_sku(&self, sku: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE sku = ?1")
            .bind(sku)
            .fetch_optional(&self.pool)
            .await?;
        Ok(product)
    }

    /// Lists products, newest first.
    pub async fn list(&self, filter: &ProductFilter, page: PageRequest) -> EngineResult<Page<Product>> {
        let search = match filter.search.as_deref() {
            Some(raw) => Some(validate_search_query(raw)?).filter(|s| !s.is_empty()),
            None => None,
        };

        let mut count_qb: QueryBuilder<'_, Sqlite> = QueryBuilder::new("SELECT COUNT(*) FROM products");
        filter.push_where(&mut count_qb, search.clone());
        let total: i64 = count_qb
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
            .map_err(DbError::from)?;

        let mut qb: QueryBuilder<'_, Sqlite> = QueryBuilder::new("SELECT * FROM products");
        filter.push_where(&mut qb, search);
        qb.push(" ORDER BY created_at DESC, rowid DESC LIMIT ")
            .push_bind(page.limit)
            .push(" OFFSET ")
            .push_bind(page.offset());

        let items = qb
            .build_query_as::<Product>()
            .fetch_all(&self.pool)
            .await
            .map_err(DbError::from)?;

        debug!(total, returned = items.len(), "Listed products");
        Ok(page_of(items, total, page))
    }

    /// Applies a partial update. Stock cannot be changed here.
    pub async fn update(&self, id: &str, update: ProductUpdate) -> EngineResult<Product> {
        let mut product = self
            .get(id)
            .await?
            .ok_or_else(|| CoreError::ProductNotFound(id.to_string()))?;

        if let Some(name) = update.name {
            validate_name("name", &name)?;
            product.name = name.trim().to_string();
        }
        if update.description.is_some() {
            product.description = update.description;
        }
        if let Some(category_id) = update.category_id {
            if self.category_exists(&category_id).await? {
                product.category_id = category_id;
            } else {
                return Err(CoreError::CategoryNotFound(category_id).into());
            }
        }
        if let Some(cents) = update.price_retail_cents {
            validate_amount_cents("price_retail", cents)?;
            product.price_retail_cents = cents;
        }
        if let Some(cents) = update.price_wholesale_cents {
            validate_amount_cents("price_wholesale", cents)?;
            product.price_wholesale_cents = cents;
        }
        if let Some(unit) = update.unit {
            product.unit = unit;
        }
        if let Some(gsm) = update.gsm {
            validate_gsm(gsm)?;
            product.gsm = gsm;
        }
        product.updated_at = Utc::now();

        sqlx::query(
            r#"
            UPDATE products SET
                name = ?2,
                description = ?3,
                category_id = ?4,
                price_retail_cents = ?5,
                price_wholesale_cents = ?6,
                unit = ?7,
                gsm = ?8,
                updated_at = ?9
            WHERE id = ?1
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(&product.category_id)
        .bind(product.price_retail_cents)
        .bind(product.price_wholesale_cents)
        .bind(product.unit)
        .bind(product.gsm)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        debug!(id = %product.id, "Product updated");
        Ok(product)
    }

    /// Deletes a product. Order lines and ledger rows keep their name
    /// snapshot.
    pub async fn delete(&self, id: &str) -> EngineResult<()> {
        let result = sqlx::query("DELETE FROM products WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::ProductNotFound(id.to_string()).into());
        }

        info!(id = %id, "Product deleted");
        Ok(())
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn category_exists(&self, id: &str) -> DbResult<bool> {
        let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM categories WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(found.is_some())
    }
}

// =============================================================================
// Transactional helpers
// =============================================================================

pub(crate) async fn find_in(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Product>> {
    let product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = ?1")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(product)
}

/// `TAR-NNN` with `NNN = count + 1`, bumped past any SKU already taken.
async fn next_sku_in(conn: &mut SqliteConnection) -> DbResult<String> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
        .fetch_one(&mut *conn)
        .await?;

    let mut n = count + 1;
    loop {
        let sku = format_sku(n);
        let taken: Option<i64> = sqlx::query_scalar("SELECT 1 FROM products WHERE sku = ?1")
            .bind(&sku)
            .fetch_optional(&mut *conn)
            .await?;
        if taken.is_none() {
            return Ok(sku);
        }
        n += 1;
    }
}

pub fn format_sku(n: i64) -> String {
    format!("TAR-{:03}", n)
}

// =============================================================================
// Unit Tests
// =============================================================================
