//! # Seed Data Generator
//!
//! Fills an empty database with grocery products for development.
//!
//! ## Usage
//! ```bash
//! # Generate 500 products (default) into KASIR_DATABASE_PATH
//! cargo run -p kasir-db --bin seed
//!
//! # Generate custom amount
//! cargo run -p kasir-db --bin seed -- --count 2000
//!
//! # Specify database path
//! cargo run -p kasir-db --bin seed -- --db ./data/kasir.db
//! ```
//!
//! Products go through the same bulk import the catalog uses, so they get
//! sequencer ids ("001", "002", ...) and unique barcodes.

use std::env;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use kasir_core::{Money, ProductDraft};
use kasir_db::{Database, KasirConfig};

/// (category, subcategory, names)
const CATEGORIES: &[(&str, &str, &[&str])] = &[
    (
        "Minuman",
        "Botol",
        &[
            "Teh Botol Sosro",
            "Aqua",
            "Le Minerale",
            "Pocari Sweat",
            "Fruit Tea",
            "Coca-Cola",
            "Sprite",
            "Good Day Coffee",
            "Ultra Milk",
            "Floridina",
        ],
    ),
    (
        "Makanan",
        "Mi Instan",
        &[
            "Indomie Goreng",
            "Indomie Soto",
            "Mie Sedaap Goreng",
            "Mie Sedaap Kari",
            "Sarimi Isi 2",
            "Supermi Ayam",
            "Pop Mie",
            "Indomie Kari Ayam",
        ],
    ),
    (
        "Makanan",
        "Camilan",
        &[
            "Chitato",
            "Qtela Singkong",
            "Taro Net",
            "Beng-Beng",
            "Silverqueen",
            "Roma Kelapa",
            "Oreo",
            "Tango Wafer",
            "Richeese Nabati",
            "Potabee",
        ],
    ),
    (
        "Sembako",
        "Dapur",
        &[
            "Beras Pandan Wangi",
            "Gula Pasir",
            "Minyak Goreng Bimoli",
            "Tepung Terigu Segitiga",
            "Kecap Bango",
            "Saus Sambal ABC",
            "Garam Dapur",
            "Telur Ayam",
        ],
    ),
    (
        "Kebutuhan Rumah",
        "Kebersihan",
        &[
            "Sabun Lifebuoy",
            "Rinso Cair",
            "Sunlight",
            "Pepsodent",
            "Shampo Sunsilk",
            "Tisu Paseo",
            "Baygon",
            "So Klin Pewangi",
        ],
    ),
];

/// (size label, price add-on in rupiah)
const SIZES: &[(&str, i64)] = &[
    ("Kecil", 0),
    ("Sedang", 1_500),
    ("Besar", 3_000),
    ("Renteng", 9_000),
    ("Dus", 40_000),
];

const DEFAULT_COUNT: usize = 500;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut config = KasirConfig::load()?;
    let mut count = DEFAULT_COUNT;

    let args: Vec<String> = env::args().collect();
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if let Some(value) = args.get(i + 1) {
                    count = value.parse()?;
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if let Some(value) = args.get(i + 1) {
                    config.database_path = value.into();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Kasir Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of products to generate (default: {DEFAULT_COUNT})");
                println!("  -d, --db <PATH>    Database file path (default: KASIR_DATABASE_PATH or ./kasir.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            other => warn!(arg = %other, "Ignoring unknown argument"),
        }
        i += 1;
    }

    info!(db = %config.database_path.display(), count, "Seeding products");

    let db = Database::new(config.db_config()).await?;

    let existing = db.products().count().await?;
    if existing > 0 {
        warn!(existing, "Database already has products, skipping seed");
        return Ok(());
    }

    let start = std::time::Instant::now();
    let report = db.products().import(generate_drafts(count)).await?;
    let elapsed = start.elapsed();

    info!(
        inserted = report.inserted.len(),
        skipped = report.skipped,
        ?elapsed,
        "Seed complete"
    );

    db.close().await;
    Ok(())
}

fn generate_drafts(count: usize) -> Vec<ProductDraft> {
    CATEGORIES
        .iter()
        .flat_map(|(category, subcategory, names)| {
            names.iter().flat_map(move |name| {
                SIZES
                    .iter()
                    .map(move |(size, addon)| (*category, *subcategory, *name, *size, *addon))
            })
        })
        .take(count)
        .enumerate()
        .map(|(seed, (category, subcategory, name, size, addon))| {
            // Base price Rp 1.000 - Rp 25.900 in steps of 100
            let base = 1_000 + ((seed as i64 * 37) % 250) * 100;

            ProductDraft {
                id: None,
                name: format!("{name} {size}"),
                category: category.to_string(),
                subcategory: subcategory.to_string(),
                // EAN-13 shaped, checksum not computed
                barcode: format!("899{seed:010}"),
                price: Money::from_cents(base + addon),
                stock: (seed as i64 * 7) % 101,
            }
        })
        .collect()
}
