//! # Seed Data Generator
//!
//! Populates a fresh database with staff accounts and a small catalog for
//! development.
//!
//! ## Usage
//! ```bash
//! # Seed ./pos.db (or $DATABASE_PATH)
//! cargo run -p pos-api --bin seed
//!
//! # Specify database path
//! cargo run -p pos-api --bin seed -- --db ./data/pos.db
//!
//! # Choose the admin password
//! SEED_ADMIN_PASSWORD=s3cret cargo run -p pos-api --bin seed
//! ```
//!
//! ## Generated Data
//! - `admin` (admin) and `kasir1` (cashier, password `kasir123`)
//! - Categories: Minuman, Makanan, Kebutuhan Rumah
//! - A handful of products per category
//!
//! Initial stock is booked through `adjust_stock`, so every unit on the
//! shelf has a matching `in` ledger entry.

use std::env;

use pos_api::auth::hash_password;
use pos_core::stock::StockAdjustment;
use pos_core::{Money, Role, StockDirection};
use pos_db::repository::product::ProductInput;
use pos_db::repository::user::NewUser;
use pos_db::{adjust_stock, Database, DbConfig};

/// (category, [(product, price, opening stock)])
const CATALOG: &[(&str, &[(&str, &str, i64)])] = &[
    (
        "Minuman",
        &[
            ("Kopi Susu", "10.00", 50),
            ("Es Teh Manis", "5.00", 80),
            ("Air Mineral 600ml", "3.50", 120),
            ("Jus Jeruk", "12.00", 30),
        ],
    ),
    (
        "Makanan",
        &[
            ("Roti Tawar", "15.00", 25),
            ("Nasi Goreng", "22.50", 20),
            ("Keripik Singkong", "7.00", 60),
        ],
    ),
    (
        "Kebutuhan Rumah",
        &[
            ("Sabun Mandi", "4.25", 40),
            ("Deterjen 1kg", "18.00", 15),
        ],
    ),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();
    let mut db_path = env::var("DATABASE_PATH").unwrap_or_else(|_| "pos.db".to_string());

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Till POS Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: $DATABASE_PATH or pos.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("Till POS Seed Data Generator");
    println!("============================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.users().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} users", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    // Staff
    let admin_password =
        env::var("SEED_ADMIN_PASSWORD").unwrap_or_else(|_| "admin123".to_string());
    let admin = db
        .users()
        .create(
            &NewUser {
                username: "admin".to_string(),
                password_hash: hash_password(&admin_password)?,
                role: Role::Admin,
                full_name: "Administrator".to_string(),
            },
            None,
        )
        .await?;
    db.users()
        .create(
            &NewUser {
                username: "kasir1".to_string(),
                password_hash: hash_password("kasir123")?,
                role: Role::Cashier,
                full_name: "Kasir Satu".to_string(),
            },
            Some(admin.id),
        )
        .await?;
    println!("✓ Created users: admin, kasir1");

    // Catalog
    let mut products = 0;
    for (category_name, items) in CATALOG {
        let category = db.categories().create(category_name, admin.id).await?;

        for (name, price, stock) in *items {
            let product = db
                .products()
                .create(
                    &ProductInput {
                        name: name.to_string(),
                        price: Money::parse(price)?,
                        category_id: Some(category.id),
                    },
                    admin.id,
                )
                .await?;

            adjust_stock(
                &db,
                admin.id,
                StockAdjustment {
                    product_id: product.id,
                    quantity: *stock,
                    direction: StockDirection::In,
                    reason: "Opening stock".to_string(),
                },
            )
            .await?;
            products += 1;
        }
    }
    println!("✓ Created {} categories, {} products", CATALOG.len(), products);

    db.close().await;
    println!();
    println!("Done. Log in as admin / {}", admin_password);
    Ok(())
}
