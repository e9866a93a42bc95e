//! # Seed / Demo Runner
//!
//! Drives an engine over an in-memory collection and prints the resulting
//! inventory. Useful for eyeballing logs and priority status.
//!
//! ## Usage
//! ```bash
//! cargo run -p restock-sync --bin restock-seed
//!
//! # Custom user and config file
//! cargo run -p restock-sync --bin restock-seed -- --user alice --config ./restock.toml
//!
//! # More logging
//! RUST_LOG=debug cargo run -p restock-sync --bin restock-seed
//! ```

use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use serde_json::json;
use tracing::info;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{reload, EnvFilter, Registry};

use restock_core::{EditField, NewItem, UserId};
use restock_sync::{EngineConfig, InMemoryCollection, InventoryEngine, LoggingSettings};

/// Sample items: (name, stock, min, max, link)
const SAMPLE_ITEMS: &[(&str, i64, i64, i64, Option<&str>)] = &[
    ("Hex Bolt M8", 40, 25, 200, Some("https://parts.example/hex-bolt-m8")),
    ("Washer 8mm", 5, 50, 500, None),
    ("Wood Screw 4x40", 120, 20, 100, None),
    ("Wall Plug 6mm", 30, 30, 60, Some("https://parts.example/wall-plug-6")),
    ("Cable Tie 200mm", 0, 10, 80, None),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut user = String::from("demo-user");
    let mut config_path: Option<PathBuf> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--user" | "-u" => {
                if i + 1 < args.len() {
                    user = args[i + 1].clone();
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
                println!("Restock Seed Runner");
                println!();
                println!("Usage: restock-seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -u, --user <ID>      User whose collection is seeded (default: demo-user)");
                println!("  -c, --config <PATH>  Config file (default: platform config dir)");
                println!("  -h, --help           Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    let log_filter = init_tracing();
    let config = EngineConfig::load(config_path)?;
    if env::var_os("RUST_LOG").is_none() {
        log_filter.reload(EnvFilter::new(&config.logging.filter))?;
    }

    info!(user = %user, "Seeding in-memory collection");

    let collection = Arc::new(InMemoryCollection::new());
    let engine = InventoryEngine::with_config(collection.clone(), config);
    engine.start(user.as_str()).await?;

    for (name, stock, min, max, link) in SAMPLE_ITEMS {
        let mut candidate = NewItem::new(*name, *stock, *min, *max);
        if let Some(link) = link {
            candidate = candidate.with_link(*link);
        }
        engine.add_item(candidate).await?;
    }

    // A duplicate is rejected before reaching the store.
    if let Err(err) = engine.add_item(NewItem::new("hex bolt m8", 1, 0, 10)).await {
        println!("Rejected as expected: {}", err);
    }

    // Another writer adds a record, and a broken one.
    let user_id = UserId::from(user.as_str());
    collection.put_raw(
        &user_id,
        "external-1",
        json!({ "name": "Anchor Bolt", "stock": 12, "min": 5, "max": 40 }),
    );
    collection.put_raw(&user_id, "external-2", json!({ "name": "Broken", "stock": "n/a" }));

    // Restock the washers through an edit session.
    if let Some(washers) = engine.list_items().into_iter().find(|i| i.name == "Washer 8mm") {
        engine.begin_edit(&washers.id)?;
        engine.update_edit_field(EditField::Stock(180))?;
        engine.commit_edit().await?;
    }

    // Discontinue the cable ties.
    if let Some(ties) = engine.list_items().into_iter().find(|i| i.name == "Cable Tie 200mm") {
        engine.delete_item(&ties.id).await?;
    }

    print_table(&engine);

    let status = engine.status();
    println!();
    println!("Items: {}  High priority: {}", status.item_count, status.high_priority_count);
    println!(
        "Snapshots applied: {}  Skipped records: {}",
        status.snapshots_applied, status.skipped_records
    );

    engine.stop();
    Ok(())
}

fn print_table(engine: &InventoryEngine) {
    println!();
    println!("{:<38} {:<18} {:>6} {:>6} {:>6}  {}", "ID", "NAME", "STOCK", "MIN", "MAX", "STATUS");
    for item in engine.list_items() {
        println!(
            "{:<38} {:<18} {:>6} {:>6} {:>6}  {}",
            item.id, item.name, item.stock, item.min, item.max, item.priority_status
        );
    }
}

/// Initializes the tracing subscriber before the config is loaded.
///
/// The returned handle swaps in the configured filter once it is known.
/// `RUST_LOG` wins over the config.
fn init_tracing() -> reload::Handle<EnvFilter, Registry> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(LoggingSettings::default().filter));
    let (filter, handle) = reload::Layer::new(filter);

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    handle
}
