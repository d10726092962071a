//! # Expense Repository
//!
//! Business expenses (wages, raw material, daily running costs,
//! transport). Read by the expense breakdown report.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::info;

use tarpal_core::validation::{validate_amount_cents, validate_name};
use tarpal_core::{CoreError, Expense, ExpenseCategory, Page, PageRequest};

use crate::error::{DbError, DbResult, EngineResult};
use crate::repository::{new_id, page_of};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewExpense {
    pub title: String,
    pub category: ExpenseCategory,
    pub amount_cents: i64,
    pub note: Option<String>,
    /// Defaults to now.
    pub expense_date: Option<DateTime<Utc>>,
    pub added_by: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExpenseUpdate {
    pub title: Option<String>,
    pub category: Option<ExpenseCategory>,
    pub amount_cents: Option<i64>,
    pub note: Option<String>,
    pub expense_date: Option<DateTime<Utc>>,
}

/// `from` is inclusive, `to` exclusive.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExpenseFilter {
    pub category: Option<ExpenseCategory>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl ExpenseFilter {
    fn push_where(&self, qb: &mut QueryBuilder<'_, Sqlite>) {
        qb.push(" WHERE 1 = 1");
        if let Some(category) = self.category {
            qb.push(" AND category = ").push_bind(category);
        }
        if let Some(from) = self.from {
            qb.push(" AND expense_date >= ").push_bind(from);
        }
        if let Some(to) = self.to {
            qb.push(" AND expense_date < ").push_bind(to);
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExpenseRepository {
    pool: SqlitePool,
}

impl ExpenseRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ExpenseRepository { pool }
    }

    pub async fn create(&self, new: NewExpense) -> EngineResult<Expense> {
        validate_name("title", &new.title)?;
        validate_amount_cents("amount", new.amount_cents)?;

        let now = Utc::now();
        let expense = Expense {
            id: new_id(),
            title: new.title.trim().to_string(),
            category: new.category,
            amount_cents: new.amount_cents,
            note: new.note,
            expense_date: new.expense_date.unwrap_or(now),
            added_by: new.added_by,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO expenses (
                id, title, category, amount_cents, note, expense_date,
                added_by, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&expense.id)
        .bind(&expense.title)
        .bind(expense.category)
        .bind(expense.amount_cents)
        .bind(&expense.note)
        .bind(expense.expense_date)
        .bind(&expense.added_by)
        .bind(expense.created_at)
        .bind(expense.updated_at)
        .execute(&self.pool)
        .await?;

        info!(id = %expense.id, category = ?expense.category, amount = %expense.amount(), "Expense recorded");
        Ok(expense)
    }

    pub async fn get(&self, id: &str) -> DbResult<Option<Expense>> {
        let expense = sqlx::query_as::<_, Expense>("SELECT * FROM expenses WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(expense)
    }

    pub async fn update(&self, id: &str, update: ExpenseUpdate) -> EngineResult<Expense> {
        let mut expense = self
            .get(id)
            .await?
            .ok_or_else(|| CoreError::ExpenseNotFound(id.to_string()))?;

        if let Some(title) = update.title {
            validate_name("title", &title)?;
            expense.title = title.trim().to_string();
        }
        if let Some(category) = update.category {
            expense.category = category;
        }
        if let Some(cents) = update.amount_cents {
            validate_amount_cents("amount", cents)?;
            expense.amount_cents = cents;
        }
        if update.note.is_some() {
            expense.note = update.note;
        }
        if let Some(date) = update.expense_date {
            expense.expense_date = date;
        }
        expense.updated_at = Utc::now();

        sqlx::query(
            r#"
            UPDATE expenses
               SET title = ?2, category = ?3, amount_cents = ?4, note = ?5,
                   expense_date = ?6, updated_at = ?7
             WHERE id = ?1
            "#,
        )
        .bind(&expense.id)
        .bind(&expense.title)
        .bind(expense.category)
        .bind(expense.amount_cents)
        .bind(&expense.note)
        .bind(expense.expense_date)
        .bind(expense.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(expense)
    }

    pub async fn delete(&self, id: &str) -> EngineResult<()> {
        let result = sqlx::query("DELETE FROM expenses WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(CoreError::ExpenseNotFound(id.to_string()).into());
        }
        Ok(())
    }

    /// Lists expenses, latest expense date first.
    pub async fn list(&self, filter: &ExpenseFilter, page: PageRequest) -> DbResult<Page<Expense>> {
        let mut count_qb: QueryBuilder<'_, Sqlite> =
            QueryBuilder::new("SELECT COUNT(*) FROM expenses");
        filter.push_where(&mut count_qb);
        let total = count_qb
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
            .map_err(DbError::from)?;

        let mut qb: QueryBuilder<'_, Sqlite> = QueryBuilder::new("SELECT * FROM expenses");
        filter.push_where(&mut qb);
        qb.push(" ORDER BY expense_date DESC, rowid DESC LIMIT ")
            .push_bind(page.limit)
            .push(" OFFSET ")
            .push_bind(page.offset());

        let items = qb
            .build_query_as::<Expense>()
            .fetch_all(&self.pool)
            .await
            .map_err(DbError::from)?;

        Ok(page_of(items, total, page))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;
    use crate::pool::{Database, DbConfig};
    use chrono::TimeZone;

    fn expense(title: &str, category: ExpenseCategory, cents: i64, day: u32) -> NewExpense {
        NewExpense {
            title: title.to_string(),
            category,
            amount_cents: cents,
            note: None,
            expense_date: Some(Utc.with_ymd_and_hms(2026, 3, day, 9, 0, 0).unwrap()),
            added_by: None,
        }
    }

    #[tokio::test]
    async fn test_filter_by_category_and_range() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.expenses();

        repo.create(expense("Wages", ExpenseCategory::Worker, 5000_00, 1)).await.unwrap();
        repo.create(expense("HDPE granules", ExpenseCategory::RawMaterial, 12000_00, 5)).await.unwrap();
        repo.create(expense("Tempo hire", ExpenseCategory::Transport, 800_00, 10)).await.unwrap();

        let march_early = ExpenseFilter {
            from: Some(Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap()),
            to: Some(Utc.with_ymd_and_hms(2026, 3, 6, 0, 0, 0).unwrap()),
            ..Default::default()
        };
        let page = repo.list(&march_early, PageRequest::default()).await.unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.items[0].title, "HDPE granules");

        let transport = ExpenseFilter {
            category: Some(ExpenseCategory::Transport),
            ..Default::default()
        };
        assert_eq!(repo.list(&transport, PageRequest::default()).await.unwrap().total, 1);
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.expenses();
        let created = repo.create(expense("Tea", ExpenseCategory::Daily, 150_00, 2)).await.unwrap();

        let updated = repo
            .update(
                &created.id,
                ExpenseUpdate {
                    amount_cents: Some(175_00),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.amount_cents, 175_00);

        repo.delete(&created.id).await.unwrap();
        let err = repo.delete(&created.id).await.unwrap_err();
        assert!(matches!(err, EngineError::Core(CoreError::ExpenseNotFound(_))));
    }
}
