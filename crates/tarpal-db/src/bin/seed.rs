//! # Seed Data Generator
//!
//! Populates a development database with a tarpaulin catalog, customers,
//! orders in every payment state, an open order request and expenses.
//!
//! ## Usage
//! ```bash
//! # Seed ./tarpal_dev.db
//! cargo run -p tarpal-db --features seed --bin seed
//!
//! # Specify database path
//! cargo run -p tarpal-db --features seed --bin seed -- --db ./data/tarpal.db
//!
//! # Use a config file (engine switches apply to the seeded orders)
//! cargo run -p tarpal-db --features seed --bin seed -- --config ./tarpal.toml
//! ```
//!
//! Everything goes through the engines, so the stock ledger reflects
//! every seeded order.

use std::env;
use std::path::PathBuf;

use tarpal_core::{
    CustomerTier, ExpenseCategory, Money, OrderLine, ProductUnit, DEFAULT_HIGH_DUE_CENTS,
};
use tarpal_db::{AppConfig, CreateOrder, Database, NewCustomer, NewExpense, NewProduct, SubmitRequest};
use tracing_subscriber::EnvFilter;

/// (category, [(name, retail, wholesale, stock, unit, gsm)]), prices in rupees.
const CATALOG: &[(&str, &[(&str, i64, i64, i64, ProductUnit, i64)])] = &[
    (
        "PE Tarpaulin",
        &[
            ("PE Tarpaulin 90 GSM Blue", 28, 24, 400, ProductUnit::Meter, 100),
            ("PE Tarpaulin 120 GSM Blue/Orange", 36, 31, 350, ProductUnit::Meter, 120),
            ("PE Tarpaulin 200 GSM Silver", 58, 50, 150, ProductUnit::Meter, 200),
            ("PE Tarpaulin Roll 4x50m", 5200, 4650, 12, ProductUnit::Roll, 150),
        ],
    ),
    (
        "HDPE Sheets",
        &[
            ("HDPE Sheet 250 GSM", 74, 66, 220, ProductUnit::SqM, 250),
            ("HDPE Pond Liner 300 GSM", 92, 82, 8, ProductUnit::SqM, 300),
        ],
    ),
    (
        "Covers",
        &[
            ("Truck Cover 24x18 ft", 3400, 3050, 25, ProductUnit::Piece, 180),
            ("Machine Cover Medium", 1250, 1100, 0, ProductUnit::Piece, 160),
        ],
    ),
];

const CUSTOMERS: &[(&str, &str, &str, CustomerTier, &str)] = &[
    ("Sharma Traders", "sharma.traders@example.com", "+919812300001", CustomerTier::Wholesaler, "Ludhiana"),
    ("Gupta Transport Co", "gupta.transport@example.com", "+919812300002", CustomerTier::Wholesaler, "Delhi"),
    ("Ravi Kumar", "ravi.kumar@example.com", "+919812300003", CustomerTier::Retailer, "Jaipur"),
    ("Anita Farms", "anita.farms@example.com", "+919812300004", CustomerTier::Retailer, "Nashik"),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tarpal_db=debug,sqlx=warn"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut db_path: Option<PathBuf> = None;
    let mut config_path: Option<PathBuf> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Tarpal Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>        Database file path (default: ./tarpal_dev.db)");
                println!("  -c, --config <PATH>    Config file (default: ./tarpal.toml if present)");
                println!("  -h, --help             Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    let mut config = AppConfig::load(config_path)?;
    config.database.path = db_path.unwrap_or_else(|| PathBuf::from("./tarpal_dev.db"));

    println!("Tarpal Seed Data Generator");
    println!("==========================");
    println!("Database: {}", config.database.path.display());
    println!();

    let db = Database::new(config.db_config()).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    // Catalog
    println!();
    println!("Creating catalog...");
    let mut product_ids = Vec::new();
    for (category_name, products) in CATALOG {
        let category = db.categories().create(category_name, None).await?;
        for (name, retail, wholesale, stock, unit, gsm) in products.iter() {
            let product = db
                .products()
                .create(
                    NewProduct::new(
                        *name,
                        Money::from_major(*retail).cents(),
                        Money::from_major(*wholesale).cents(),
                    )
                    .category(&category.id)
                    .stock(*stock)
                    .unit(*unit)
                    .gsm(*gsm),
                )
                .await?;
            println!("  {} {} (stock {})", product.sku, product.name, product.stock);
            product_ids.push(product.id);
        }
    }

    // Customers
    println!();
    println!("Creating customers...");
    let mut customer_ids = Vec::new();
    for (name, email, phone, tier, city) in CUSTOMERS {
        let customer = db
            .customers()
            .create(NewCustomer {
                name: name.to_string(),
                email: email.to_string(),
                phone: phone.to_string(),
                tier: *tier,
                city: Some(city.to_string()),
            })
            .await?;
        println!("  {} ({})", customer.name, customer.tier);
        customer_ids.push(customer.id);
    }

    // Orders: unpaid, partially paid, paid, and one cancelled
    println!();
    println!("Creating orders...");
    let engine = db.order_engine();

    let unpaid = engine
        .create_order(CreateOrder::new(
            &customer_ids[2],
            vec![OrderLine::new(&product_ids[0], 40)],
        ))
        .await?;

    let partial = engine
        .create_order(
            CreateOrder::new(
                &customer_ids[0],
                vec![
                    OrderLine::new(&product_ids[1], 100),
                    OrderLine::new(&product_ids[6], 2),
                ],
            )
            .discount(Money::from_major(200))
            .instructions("Deliver to godown 3"),
        )
        .await?;
    engine
        .record_payment(&partial.id, Money::from_major(3000), None)
        .await?;

    let paid = engine
        .create_order(
            CreateOrder::new(&customer_ids[1], vec![OrderLine::new(&product_ids[3], 2)])
                .amount_paid(Money::from_major(9300)),
        )
        .await?;

    let cancelled = engine
        .create_order(CreateOrder::new(
            &customer_ids[3],
            vec![OrderLine::new(&product_ids[4], 30)],
        ))
        .await?;
    engine.cancel_order(&cancelled.id).await?;

    for created in [&unpaid, &partial, &paid, &cancelled] {
        println!("  {}", created.order_code);
    }

    // An open request for the admin queue
    let request = db
        .requests()
        .submit(
            SubmitRequest::new(&customer_ids[3], vec![OrderLine::new(&product_ids[5], 5)])
                .note("Need before monsoon"),
        )
        .await?;
    println!();
    println!("✓ Pending order request {}", request.id);

    // Expenses
    println!();
    println!("Recording expenses...");
    let expenses = [
        ("Weekly wages", ExpenseCategory::Worker, 18_000),
        ("HDPE granules 500kg", ExpenseCategory::RawMaterial, 62_500),
        ("Tea and snacks", ExpenseCategory::Daily, 450),
        ("Tempo to Delhi", ExpenseCategory::Transport, 2_800),
    ];
    for (title, category, rupees) in expenses {
        db.expenses()
            .create(NewExpense {
                title: title.to_string(),
                category,
                amount_cents: Money::from_major(rupees).cents(),
                note: None,
                expense_date: None,
                added_by: None,
            })
            .await?;
    }

    let summary = db.reports().payment_summary().await?;
    println!();
    println!("✓ Seed complete!");
    println!("  Collected:   {}", summary.total_collected);
    println!("  Outstanding: {}", summary.outstanding);
    println!("  Recovery:    {:.2}%", summary.recovery_percent);

    let high_due = db
        .reports()
        .high_due_customers(Money::from_cents(DEFAULT_HIGH_DUE_CENTS))
        .await?;
    for customer in &high_due {
        println!("  High due:    {} owes {}", customer.name, customer.total_due);
    }

    Ok(())
}
