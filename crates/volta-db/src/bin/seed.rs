//! # Seed Data Generator
//!
//! Populates the database with demo catalog data for development.
//!
//! ## Usage
//! ```bash
//! # Seed the default database
//! cargo run -p volta-db --bin seed
//!
//! # Specify database path
//! cargo run -p volta-db --bin seed -- --db ./data/volta.db
//! ```
//!
//! ## Generated Data
//! - Electrical products (fans, wiring, switchgear, lighting)
//! - Service types with visiting-charge brackets
//! - A small electrician roster
//! - A couple of demo customers

use chrono::Utc;
use std::env;
use uuid::Uuid;
use volta_core::{Customer, Electrician, Product, ServiceType};
use volta_db::{Database, DbConfig};

/// Demo products: (sku, name, category, price in paise, stock).
const PRODUCTS: &[(&str, &str, &str, i64, i64)] = &[
    ("FAN-1200-WH", "Ceiling Fan 1200mm White", "fans", 189_900, 24),
    ("FAN-1200-BR", "Ceiling Fan 1200mm Brown", "fans", 189_900, 18),
    ("FAN-TABLE-400", "Table Fan 400mm", "fans", 134_900, 12),
    ("FAN-EXH-250", "Exhaust Fan 250mm", "fans", 99_900, 15),
    ("WIRE-1.5-90M", "Copper Wire 1.5 sqmm 90m", "wiring", 164_500, 30),
    ("WIRE-2.5-90M", "Copper Wire 2.5 sqmm 90m", "wiring", 259_000, 22),
    ("WIRE-4.0-90M", "Copper Wire 4.0 sqmm 90m", "wiring", 412_000, 10),
    ("SW-6A-WH", "Modular Switch 6A", "switchgear", 4_500, 200),
    ("SW-16A-WH", "Modular Switch 16A", "switchgear", 8_900, 120),
    ("SOCK-6A", "Socket 6A 3-pin", "switchgear", 6_500, 150),
    ("MCB-16A-SP", "MCB 16A Single Pole", "switchgear", 21_500, 40),
    ("MCB-32A-DP", "MCB 32A Double Pole", "switchgear", 48_500, 25),
    ("TUBE-LED-20W", "LED Batten 20W", "lighting", 44_900, 60),
    ("BULB-LED-9W", "LED Bulb 9W B22", "lighting", 9_900, 300),
    ("PANEL-LED-15W", "LED Panel 15W Round", "lighting", 54_900, 45),
    ("INV-900VA", "Inverter 900VA", "power", 4_599_000, 6),
    ("BAT-150AH", "Inverter Battery 150Ah", "power", 13_999_000, 4),
    ("STAB-4KVA", "Voltage Stabilizer 4kVA", "power", 349_900, 8),
];

/// Demo service types:
/// (name, base charge, upto 500m, 1km, 3km, 5km, 7km) - paise, 0 = unset.
const SERVICE_TYPES: &[(&str, i64, i64, i64, i64, i64, i64)] = &[
    ("Fan Installation", 20_000, 10_000, 12_000, 15_000, 18_000, 25_000),
    ("Wiring Inspection", 30_000, 15_000, 18_000, 22_000, 27_000, 35_000),
    ("Inverter Service", 25_000, 0, 0, 0, 0, 0),
    ("Switchboard Repair", 15_000, 8_000, 10_000, 12_000, 0, 0),
    ("New Connection Setup", 0, 0, 0, 0, 0, 0),
];

/// Demo electrician roster: (name, phone).
const ELECTRICIANS: &[(&str, &str)] = &[
    ("Suresh Patil", "9876501234"),
    ("Manoj Kumar", "9876505678"),
    ("Irfan Shaikh", "9876509012"),
];

/// Demo customers: (name, phone, address, pincode).
const CUSTOMERS: &[(&str, &str, &str, &str)] = &[
    ("Asha Verma", "9876543210", "12 MG Road, Indore", "452001"),
    ("Ravi Joshi", "9822011223", "45 Palasia, Indore", "452001"),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./volta_dev.db");

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
                println!("Volta Commerce Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./volta_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Volta Commerce Seed Data Generator");
    println!("=====================================");
    println!("Database: {}", db_path);
    println!();

    // Connect to database
    let config = DbConfig::new(&db_path);
    let db = Database::new(config).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    // Refuse to double-seed
    let existing = db.products().count_active().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let now = Utc::now();

    println!();
    println!("Seeding catalog...");
    for (sku, name, category, price_paise, stock) in PRODUCTS {
        let product = Product {
            id: Uuid::new_v4().to_string(),
            sku: (*sku).to_string(),
            name: (*name).to_string(),
            description: None,
            category: Some((*category).to_string()),
            price_paise: *price_paise,
            stock_quantity: *stock,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        db.products().insert(&product).await?;
    }
    println!("  {} products", PRODUCTS.len());

    for (name, base, m500, km1, km3, km5, km7) in SERVICE_TYPES {
        let nonzero = |paise: i64| if paise > 0 { Some(paise) } else { None };
        let service = ServiceType {
            id: Uuid::new_v4().to_string(),
            name: (*name).to_string(),
            description: None,
            base_visiting_charge_paise: nonzero(*base),
            charge_upto_500m_paise: nonzero(*m500),
            charge_upto_1km_paise: nonzero(*km1),
            charge_upto_3km_paise: nonzero(*km3),
            charge_upto_5km_paise: nonzero(*km5),
            charge_upto_7km_paise: nonzero(*km7),
            is_active: true,
            created_at: now,
        };
        db.service_types().insert(&service).await?;
    }
    println!("  {} service types", SERVICE_TYPES.len());

    for (name, phone) in ELECTRICIANS {
        let electrician = Electrician {
            id: Uuid::new_v4().to_string(),
            name: (*name).to_string(),
            phone: (*phone).to_string(),
            email: None,
            is_active: true,
            created_at: now,
        };
        db.electricians().insert(&electrician).await?;
    }
    println!("  {} electricians", ELECTRICIANS.len());

    for (name, phone, address, pincode) in CUSTOMERS {
        let customer = Customer {
            id: Uuid::new_v4().to_string(),
            name: (*name).to_string(),
            phone: (*phone).to_string(),
            email: None,
            address: (*address).to_string(),
            pincode: (*pincode).to_string(),
            free_delivery_used_count: 0,
            created_at: now,
            updated_at: now,
        };
        db.customers().insert(&customer).await?;
    }
    println!("  {} customers", CUSTOMERS.len());

    println!();
    println!("✓ Seed complete!");

    Ok(())
}
