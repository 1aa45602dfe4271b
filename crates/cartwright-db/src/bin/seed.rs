//! # Seed Data Generator
//!
//! Populates the catalog with products for local development.
//!
//! ## Usage
//! ```bash
//! # Generate 200 products (default)
//! cargo run -p cartwright-db --bin seed
//!
//! # Generate custom amount
//! cargo run -p cartwright-db --bin seed -- --count 1000
//!
//! # Specify database path
//! cargo run -p cartwright-db --bin seed -- --db ./data/cartwright.db
//! ```
//!
//! ## Generated Products
//! Ids look like `{line}-{style}-{size}` (e.g. `tee-classic-m`), so they are
//! valid cart product ids and easy to type into curl.
//!
//! Stock is spread from 0 to 25 so sold-out and low-stock items show up
//! alongside plenty. Two fixed fixtures are always added first:
//! - `last-one` with exactly one unit
//! - `sold-out` with none

use anyhow::Context;
use chrono::Utc;
use std::env;

use cartwright_core::Product;
use cartwright_db::{Database, DbConfig};

/// Product lines and their base prices in cents.
const LINES: &[(&str, &str, i64)] = &[
    ("tee", "T-Shirt", 2200),
    ("hoodie", "Hoodie", 5400),
    ("cap", "Cap", 1800),
    ("mug", "Mug", 1400),
    ("tote", "Tote Bag", 1600),
    ("sock", "Socks", 900),
    ("poster", "Poster", 2500),
    ("sticker", "Sticker Pack", 500),
];

const STYLES: &[&str] = &[
    "classic", "vintage", "logo", "stripe", "night", "sunrise", "forest", "ocean",
];

/// Size variants with price addons in cents.
const SIZES: &[(&str, &str, i64)] = &[
    ("s", "Small", 0),
    ("m", "Medium", 0),
    ("l", "Large", 200),
    ("xl", "XL", 400),
];

const DEFAULT_COUNT: usize = 200;
const DEFAULT_DB_PATH: &str = "./data/cartwright.db";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();

    let mut count: usize = DEFAULT_COUNT;
    let mut db_path = String::from(DEFAULT_DB_PATH);

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(DEFAULT_COUNT);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Cartwright Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of products to generate (default: {DEFAULT_COUNT})");
                println!("  -d, --db <PATH>    Database file path (default: {DEFAULT_DB_PATH})");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Cartwright Seed Data Generator");
    println!("=================================");
    println!("Database: {}", db_path);
    println!("Products: {}", count);
    println!();

    if let Some(parent) = std::path::Path::new(&db_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
    }

    let db = Database::new(DbConfig::new(&db_path))
        .await
        .context("opening database")?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    println!();
    println!("Generating products...");

    let start = std::time::Instant::now();
    let mut generated = 0;

    for fixture in [
        fixture("last-one", "Last One Standing Mug", 1400, 1),
        fixture("sold-out", "Sold Out Hoodie", 5400, 0),
    ] {
        db.products().insert(&fixture).await?;
        println!("  Fixture {} (stock {})", fixture.id, fixture.quantity_on_hand);
    }

    'outer: for (line_idx, (line_code, line_name, base_price)) in LINES.iter().enumerate() {
        for (style_idx, style) in STYLES.iter().enumerate() {
            for (size_idx, (size_code, size_name, addon)) in SIZES.iter().enumerate() {
                if generated >= count {
                    break 'outer;
                }

                let seed = line_idx * 100 + style_idx * 10 + size_idx;
                let product = generate_product(
                    line_code, line_name, style, size_code, size_name, base_price + addon, seed,
                );

                if let Err(e) = db.products().insert(&product).await {
                    eprintln!("Failed to insert {}: {}", product.id, e);
                    continue;
                }

                generated += 1;

                if generated % 50 == 0 {
                    println!("  Generated {} products...", generated);
                }
            }
        }
    }

    let elapsed = start.elapsed();
    println!();
    println!("✓ Generated {} products in {:?}", generated, elapsed);

    let sample = db.products().list_active(3).await?;
    for product in &sample {
        println!(
            "  {} | {} | {} | stock {}",
            product.id,
            product.name,
            product.price(),
            product.quantity_on_hand
        );
    }

    println!();
    println!("✓ Seed complete!");

    Ok(())
}

fn fixture(id: &str, name: &str, price_cents: i64, stock: i64) -> Product {
    let now = Utc::now();
    Product {
        id: id.to_string(),
        name: name.to_string(),
        price_cents,
        quantity_on_hand: stock,
        is_active: true,
        created_at: now,
        updated_at: now,
    }
}

/// Generates a single product with plausible data.
fn generate_product(
    line_code: &str,
    line_name: &str,
    style: &str,
    size_code: &str,
    size_name: &str,
    price_cents: i64,
    seed: usize,
) -> Product {
    let mut style_name = style.to_string();
    if let Some(first) = style_name.get_mut(..1) {
        first.make_ascii_uppercase();
    }

    fixture(
        &format!("{line_code}-{style}-{size_code}"),
        &format!("{style_name} {line_name} ({size_name})"),
        price_cents,
        // 0-25, roughly one in twenty-six sold out
        ((seed * 7) % 26) as i64,
    )
}
