//! # Category Repository
//!
//! Product categories. Deleting a category never orphans products:
//!
//! ```text
//! delete("Tarpaulin")
//!      │
//!      ├── find or create "Uncategorized"
//!      ├── UPDATE products SET category_id = <uncategorized>
//!      └── DELETE the category           (one transaction)
//! ```

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use tarpal_core::validation::validate_name;
use tarpal_core::{Category, CoreError, FALLBACK_CATEGORY};

use crate::error::{DbError, DbResult, EngineResult};
use crate::repository::new_id;

/// Repository for category database operations.
#[derive(Debug, Clone)]
pub struct CategoryRepository {
    pool: SqlitePool,
}

impl CategoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CategoryRepository { pool }
    }

    /// Creates a category. Names are unique, case-insensitively.
    pub async fn create(&self, name: &str, description: Option<String>) -> EngineResult<Category> {
        validate_name("name", name)?;
        let mut conn = self.pool.acquire().await.map_err(DbError::from)?;
        let category = insert_in(&mut conn, name.trim(), description).await?;
        info!(id = %category.id, name = %category.name, "Category created");
        Ok(category)
    }

    pub async fn get(&self, id: &str) -> DbResult<Option<Category>> {
        let category = sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(category)
    }

    pub async fn get_by_name(&self, name: &str) -> DbResult<Option<Category>> {
        let category = sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE name = ?1")
            .bind(name.trim())
            .fetch_optional(&self.pool)
            .await?;
        Ok(category)
    }

    /// All categories, by name.
    pub async fn list(&self) -> DbResult<Vec<Category>> {
        let categories =
            sqlx::query_as::<_, Category>("SELECT * FROM categories ORDER BY name COLLATE NOCASE")
                .fetch_all(&self.pool)
                .await?;
        Ok(categories)
    }

    /// Renames a category and/or replaces its description.
    pub async fn update(
        &self,
        id: &str,
        name: Option<&str>,
        description: Option<String>,
    ) -> EngineResult<Category> {
        let mut category = self
            .get(id)
            .await?
            .ok_or_else(|| CoreError::CategoryNotFound(id.to_string()))?;

        if let Some(name) = name {
            validate_name("name", name)?;
            if category.name == FALLBACK_CATEGORY && name.trim() != FALLBACK_CATEGORY {
                return Err(CoreError::ProtectedCategory(category.name).into());
            }
            category.name = name.trim().to_string();
        }
        if description.is_some() {
            category.description = description;
        }
        category.updated_at = Utc::now();

        sqlx::query(
            r#"
            UPDATE categories SET name = ?2, description = ?3, updated_at = ?4
            WHERE id = ?1
            "#,
        )
        .bind(&category.id)
        .bind(&category.name)
        .bind(&category.description)
        .bind(category.updated_at)
        .execute(&self.pool)
        .await?;

        debug!(id = %category.id, "Category updated");
        Ok(category)
    }

    /// Deletes a category, moving its products to `Uncategorized`.
    ///
    /// ## Returns
    /// Number of products that were reassigned.
    pub async fn delete(&self, id: &str) -> EngineResult<u64> {
        let mut tx = self.pool.begin().await.map_err(DbError::from)?;

        let category = find_in(&mut tx, id)
            .await?
            .ok_or_else(|| CoreError::CategoryNotFound(id.to_string()))?;
        if category.name == FALLBACK_CATEGORY {
            return Err(CoreError::ProtectedCategory(category.name).into());
        }

        let fallback = fallback_in(&mut tx).await?;
        let moved = sqlx::query(
            "UPDATE products SET category_id = ?1, updated_at = ?2 WHERE category_id = ?3",
        )
        .bind(&fallback.id)
        .bind(Utc::now())
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(DbError::from)?
        .rows_affected();

        sqlx::query("DELETE FROM categories WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(DbError::from)?;

        tx.commit().await.map_err(DbError::from)?;
        info!(id = %id, name = %category.name, moved, "Category deleted");
        Ok(moved)
    }
}

// =============================================================================
// Transactional helpers
// =============================================================================

pub(crate) async fn find_in(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Category>> {
    let category = sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE id = ?1")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(category)
}

pub(crate) async fn insert_in(
    conn: &mut SqliteConnection,
    name: &str,
    description: Option<String>,
) -> DbResult<Category> {
    let now = Utc::now();
    let category = Category {
        id: new_id(),
        name: name.to_string(),
        description,
        created_at: now,
        updated_at: now,
    };

    sqlx::query(
        r#"
        INSERT INTO categories (id, name, description, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
    )
    .bind(&category.id)
    .bind(&category.name)
    .bind(&category.description)
    .bind(category.created_at)
    .bind(category.updated_at)
    .execute(&mut *conn)
    .await
    .map_err(|e| match DbError::from(e) {
        DbError::UniqueViolation { field, .. } => DbError::UniqueViolation {
            field,
            value: name.to_string(),
        },
        other => other,
    })?;

    Ok(category)
}

/// The `Uncategorized` category, created on first use.
pub(crate) async fn fallback_in(conn: &mut SqliteConnection) -> DbResult<Category> {
    let existing = sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE name = ?1")
        .bind(FALLBACK_CATEGORY)
        .fetch_optional(&mut *conn)
        .await?;
    match existing {
        Some(category) => Ok(category),
        None => {
            debug!("Creating fallback category");
            insert_in(conn, FALLBACK_CATEGORY, None).await
        }
    }
}
