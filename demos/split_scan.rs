//! Split-parallel scan over an in-memory collection.
//!
//! Demonstrates:
//! - Loading a reader config from JSON
//! - Planning splits and reading them on a rayon pool
//! - Driving one split reader by hand
//! - Exporting rows as JSON Lines
//! - Scan metrics
//!
//! Run with: cargo run --example split_scan
//! Set `RUST_LOG=ironbeam_mongo=debug` to see split lifecycle events.

use anyhow::Result;
use bson::{doc, DateTime};
use ironbeam_mongo::*;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("🍃 Split-parallel MongoDB scan\n");

    let store = FakeMongoStore::with_documents(
        (0..1_000_i64)
            .map(|i| {
                let status = if i % 3 == 0 { "open" } else { "shipped" };
                let total = i as f64 * 1.25;
                let placed_at = DateTime::from_millis(1_700_000_000_000 + i * 60_000);
                let items: Vec<String> = (0..i % 4).map(|n| format!("sku-{n}")).collect();
                doc! {
                    "orderId": i,
                    "customer": { "name": format!("customer-{}", i % 37) },
                    "total": total,
                    "status": status,
                    "placedAt": placed_at,
                    "items": items,
                }
            })
            .collect(),
    );

    let config = MongoReaderConfig::from_json_str(
        r#"{
            "hostPorts": "localhost:27017",
            "database": "shop",
            "collectionName": "orders",
            "column": [
                { "name": "order_id", "type": "long", "path": "orderId" },
                { "name": "customer", "type": "string", "path": "customer.name" },
                { "name": "total", "type": "double" },
                { "name": "placed_at", "type": "timestamp", "path": "placedAt" },
                { "name": "items", "type": "string", "splitter": "|" },
                { "name": "source", "type": "string", "value": "demo" }
            ],
            "filter": "{\"status\": \"open\"}",
            "fetchSize": 128
        }"#,
    )?;
    println!("Config: {config:?}\n");

    let source = MongoSource::from_config(&config, store.connector())?;

    // 1) Whole scan on a pool of four threads
    let runner = ScanRunner::parallel(Some(4)).with_min_splits(6);
    let per_split = runner.run(&source)?;
    for (i, rows) in per_split.iter().enumerate() {
        println!("split #{i}: {} rows", rows.len());
    }
    let total: usize = per_split.iter().map(Vec::len).sum();
    println!("Total open orders: {total}\n");

    // 2) One split driven through the reader lifecycle
    let splits = source.create_splits(6)?;
    let mut reader = source.create_reader();
    reader.open(splits[0])?;
    let mut shown = 0;
    while reader.has_next() && shown < 3 {
        let row = reader.next_row()?;
        println!("  {row:?}");
        shown += 1;
    }
    reader.close();
    println!("Reader state after close: {:?}\n", reader.state());

    // 3) Export
    let out = std::env::temp_dir().join("ironbeam-mongo-demo").join("open_orders.jsonl");
    let written = write_splits_jsonl_par(&out, source.columns(), &per_split)?;
    println!("Wrote {written} rows to {}", out.display());

    source.metrics().print();
    Ok(())
}
