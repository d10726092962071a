//! Shared fixtures for the engine integration tests.

#![allow(dead_code)]

use tarpal_core::{CustomerTier, Money};
use tarpal_db::{Database, DbConfig, EngineConfig, NewCustomer, NewProduct};

pub async fn db() -> Database {
    db_with(EngineConfig::default()).await
}

pub async fn db_with(engine: EngineConfig) -> Database {
    Database::new(DbConfig::in_memory().engine(engine))
        .await
        .expect("in-memory database")
}

/// Creates a customer and returns its id.
pub async fn customer(db: &Database, name: &str, tier: CustomerTier) -> String {
    let email = format!("{}@example.com", name.to_lowercase().replace(' ', "."));
    db.customers()
        .create(NewCustomer {
            name: name.to_string(),
            email,
            phone: "+91 98123 00000".to_string(),
            tier,
            city: None,
        })
        .await
        .expect("customer")
        .id
}

/// Creates a product priced in whole rupees and returns its id.
pub async fn product(db: &Database, name: &str, retail: i64, wholesale: i64, stock: i64) -> String {
    db.products()
        .create(
            NewProduct::new(
                name,
                Money::from_major(retail).cents(),
                Money::from_major(wholesale).cents(),
            )
            .stock(stock),
        )
        .await
        .expect("product")
        .id
}

pub async fn stock_of(db: &Database, product_id: &str) -> i64 {
    db.products()
        .get(product_id)
        .await
        .expect("query")
        .expect("product exists")
        .stock
}
