//! # Customer Repository
//!
//! Customers and their price tier. Changing a customer's tier affects
//! orders created afterwards only; existing orders keep the tier they
//! were created with.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::{debug, info};

use tarpal_core::validation::{validate_email, validate_name, validate_phone, validate_search_query};
use tarpal_core::{CoreError, Customer, CustomerTier, Page, PageRequest};

use crate::error::{DbError, DbResult, EngineError, EngineResult};
use crate::repository::{like_pattern, new_id, page_of};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCustomer {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub tier: CustomerTier,
    pub city: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CustomerUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub tier: Option<CustomerTier>,
    pub city: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CustomerFilter {
    pub tier: Option<CustomerTier>,
    /// Matched against name and email.
    pub search: Option<String>,
}

impl CustomerFilter {
    fn push_where(&self, qb: &mut QueryBuilder<'_, Sqlite>, search: Option<String>) {
        qb.push(" WHERE 1 = 1");
        if let Some(tier) = self.tier {
            qb.push(" AND tier = ").push_bind(tier);
        }
        if let Some(term) = search {
            let pattern = like_pattern(&term);
            qb.push(" AND (name LIKE ")
                .push_bind(pattern.clone())
                .push(" ESCAPE '\\' OR email LIKE ")
                .push_bind(pattern)
                .push(" ESCAPE '\\')");
        }
    }
}

/// Repository for customer database operations.
#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    /// Creates a customer. Emails are unique, case-insensitively.
    pub async fn create(&self, new: NewCustomer) -> EngineResult<Customer> {
        validate_name("name", &new.name)?;
        validate_email(&new.email)?;
        validate_phone(&new.phone)?;

        let now = Utc::now();
        let customer = Customer {
            id: new_id(),
            name: new.name.trim().to_string(),
            email: new.email.trim().to_string(),
            phone: new.phone.trim().to_string(),
            tier: new.tier,
            city: new.city,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO customers (id, name, email, phone, tier, city, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&customer.id)
        .bind(&customer.name)
        .bind(&customer.email)
        .bind(&customer.phone)
        .bind(customer.tier)
        .bind(&customer.city)
        .bind(customer.created_at)
        .bind(customer.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| duplicate_email(e, &customer.email))?;

        info!(id = %customer.id, tier = %customer.tier, "Customer created");
        Ok(customer)
    }

    pub async fn get(&self, id: &str) -> DbResult<Option<Customer>> {
        let customer = sqlx::query_as::<_, Customer>("SELECT * FROM customers WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(customer)
    }

    /// Lists customers alphabetically.
    pub async fn list(&self, filter: &CustomerFilter, page: PageRequest) -> EngineResult<Page<Customer>> {
        let search = match filter.search.as_deref() {
            Some(raw) => Some(validate_search_query(raw)?).filter(|s| !s.is_empty()),
            None => None,
        };

        let mut count_qb: QueryBuilder<'_, Sqlite> =
            QueryBuilder::new("SELECT COUNT(*) FROM customers");
        filter.push_where(&mut count_qb, search.clone());
        let total = count_qb
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
            .map_err(DbError::from)?;

        let mut qb: QueryBuilder<'_, Sqlite> = QueryBuilder::new("SELECT * FROM customers");
        filter.push_where(&mut qb, search);
        qb.push(" ORDER BY name COLLATE NOCASE, rowid LIMIT ")
            .push_bind(page.limit)
            .push(" OFFSET ")
            .push_bind(page.offset());

        let items = qb
            .build_query_as::<Customer>()
            .fetch_all(&self.pool)
            .await
            .map_err(DbError::from)?;

        Ok(page_of(items, total, page))
    }

    /// Applies a partial update.
    pub async fn update(&self, id: &str, update: CustomerUpdate) -> EngineResult<Customer> {
        let mut customer = self
            .get(id)
            .await?
            .ok_or_else(|| CoreError::CustomerNotFound(id.to_string()))?;

        if let Some(name) = update.name {
            validate_name("name", &name)?;
            customer.name = name.trim().to_string();
        }
        if let Some(email) = update.email {
            validate_email(&email)?;
            customer.email = email.trim().to_string();
        }
        if let Some(phone) = update.phone {
            validate_phone(&phone)?;
            customer.phone = phone.trim().to_string();
        }
        if let Some(tier) = update.tier {
            if tier != customer.tier {
                debug!(id = %customer.id, from = %customer.tier, to = %tier, "Customer tier changed");
            }
            customer.tier = tier;
        }
        if update.city.is_some() {
            customer.city = update.city;
        }
        customer.updated_at = Utc::now();

        sqlx::query(
            r#"
            UPDATE customers
               SET name = ?2, email = ?3, phone = ?4, tier = ?5, city = ?6, updated_at = ?7
             WHERE id = ?1
            "#,
        )
        .bind(&customer.id)
        .bind(&customer.name)
        .bind(&customer.email)
        .bind(&customer.phone)
        .bind(customer.tier)
        .bind(&customer.city)
        .bind(customer.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| duplicate_email(e, &customer.email))?;

        Ok(customer)
    }

    /// Deletes a customer with no orders or requests.
    ///
    /// Fails with a foreign key violation otherwise.
    pub async fn delete(&self, id: &str) -> EngineResult<()> {
        let result = sqlx::query("DELETE FROM customers WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::CustomerNotFound(id.to_string()).into());
        }

        info!(id = %id, "Customer deleted");
        Ok(())
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM customers")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

fn duplicate_email(err: sqlx::Error, email: &str) -> EngineError {
    match DbError::from(err) {
        DbError::UniqueViolation { field, .. } => DbError::UniqueViolation {
            field,
            value: email.to_string(),
        }
        .into(),
        other => other.into(),
    }
}

pub(crate) async fn find_in(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Customer>> {
    let customer = sqlx::query_as::<_, Customer>("SELECT * FROM customers WHERE id = ?1")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(customer)
}
