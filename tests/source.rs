use anyhow::Result;
use bson::doc;
use ironbeam_mongo::testing::{
    assert_row_arity, assert_rows_disjoint, assert_splits_partition, numbered_column_spec,
    numbered_documents,
};
use ironbeam_mongo::{
    ColumnDescriptor, ColumnSpec, ColumnType, ErrorKind, FakeMongoStore, MongoReaderConfig,
    MongoSource, MongoSplit, Row, ScanRunner,
};
use std::thread;

fn seqs(rows: &[Row]) -> Vec<i64> {
    rows.iter().filter_map(|r| r[0].as_i64()).collect()
}

#[test]
fn splits_cover_the_filtered_count() -> Result<()> {
    let store = FakeMongoStore::with_documents(numbered_documents(100));
    let source = MongoSource::new(
        numbered_column_spec()?,
        Some(r#"{"seq": {"$gte": 10, "$lt": 33}}"#),
        store.connector(),
    )?;
    let splits = source.create_splits(4)?;
    assert_splits_partition(&splits, 23);
    assert_eq!(splits.len(), 5);
    assert_eq!(source.metrics().splits_planned(), 5);
    // planning lease is released right away
    assert_eq!(source.connections().active_leases(), 0);
    Ok(())
}

#[test]
fn reading_all_splits_returns_every_document_once() -> Result<()> {
    let store = FakeMongoStore::with_documents(numbered_documents(37));
    let source = MongoSource::new(numbered_column_spec()?, None, store.connector())?;

    let mut all = Vec::new();
    for split in source.create_splits(5)? {
        all.extend(seqs(&source.read_split(split)?));
    }
    assert_eq!(all, (0..37).collect::<Vec<_>>());
    Ok(())
}

#[test]
fn concurrent_sessions_on_disjoint_splits_read_disjoint_rows() -> Result<()> {
    let store = FakeMongoStore::with_documents(numbered_documents(500));
    let source = MongoSource::new(numbered_column_spec()?, None, store.connector())?;
    let splits = source.create_splits(7)?;

    let per_split: Vec<Vec<Row>> = thread::scope(|s| {
        let handles: Vec<_> = splits
            .iter()
            .map(|split| {
                let source = &source;
                s.spawn(move || source.read_split(*split))
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().expect("reader thread panicked"))
            .collect::<Result<Vec<_>, _>>()
    })?;

    assert_rows_disjoint(&per_split);
    for (split, rows) in splits.iter().zip(&per_split) {
        assert_eq!(rows.len() as u64, split.limit);
        assert_row_arity(rows, 2);
    }
    assert_eq!(store.live_clients(), 0);
    assert_eq!(store.open_cursors(), 0);
    Ok(())
}

#[test]
fn empty_collection_yields_one_empty_split() -> Result<()> {
    let store = FakeMongoStore::new();
    let source = MongoSource::new(numbered_column_spec()?, None, store.connector())?;
    let splits = source.create_splits(8)?;
    assert_eq!(splits, vec![MongoSplit::new(0, 0)]);
    assert!(source.read_split(splits[0])?.is_empty());
    Ok(())
}

#[test]
fn invalid_filter_fails_at_construction() {
    let store = FakeMongoStore::with_documents(numbered_documents(3));
    let columns = numbered_column_spec().expect("fixture spec");
    let err = MongoSource::new(columns, Some("{status: open"), store.connector())
        .err()
        .expect("construction must fail");
    assert_eq!(err.kind, ErrorKind::Configuration);
    assert_eq!(store.connect_count(), 0);
}

#[test]
fn unreachable_store_fails_planning() -> Result<()> {
    let store = FakeMongoStore::with_documents(numbered_documents(3));
    store.refuse_connections(true);
    let source = MongoSource::new(numbered_column_spec()?, None, store.connector())?;
    let err = source.create_splits(2).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Connection);
    Ok(())
}

#[test]
fn from_config_applies_filter_and_columns() -> Result<()> {
    let store = FakeMongoStore::with_documents(vec![
        doc! { "sku": "a", "qty": 3, "meta": { "warehouse": "north" } },
        doc! { "sku": "b", "qty": 0, "meta": { "warehouse": "south" } },
        doc! { "sku": "c", "qty": 8, "meta": { "warehouse": "north" } },
    ]);
    let config = MongoReaderConfig::new(
        "db1:27017,db2",
        "inventory",
        "stock",
        vec![
            ColumnDescriptor::new("sku", ColumnType::String),
            ColumnDescriptor::new("warehouse", ColumnType::String).with_path("meta.warehouse"),
        ],
    )
    .with_filter(r#"{"qty": {"$gt": 0}}"#)
    .with_fetch_size(2);

    let source = MongoSource::from_config(&config, store.connector())?;
    let rows = ScanRunner::sequential()
        .with_min_splits(2)
        .run_collect(&source)?;
    let skus: Vec<_> = rows.iter().filter_map(|r| r[0].as_str()).collect();
    assert_eq!(skus, vec!["a", "c"]);
    assert_eq!(rows[1][1].as_str(), Some("north"));
    Ok(())
}

#[test]
fn from_config_rejects_invalid_config() {
    let store = FakeMongoStore::new();
    let config = MongoReaderConfig::new(
        "localhost",
        "inventory",
        "system.users",
        vec![ColumnDescriptor::new("x", ColumnType::Long)],
    );
    let err = MongoSource::from_config(&config, store.connector())
        .err()
        .expect("reserved collection must be rejected");
    assert_eq!(err.kind, ErrorKind::Configuration);
}

#[test]
fn source_exposes_columns_and_filter() -> Result<()> {
    let store = FakeMongoStore::new();
    let columns = ColumnSpec::new(vec![ColumnDescriptor::new("a", ColumnType::Int)])?;
    let source = MongoSource::new(columns.clone(), Some(r#"{"a": 1}"#), store.connector())?;
    assert_eq!(source.columns(), &columns);
    assert_eq!(source.filter(), Some(&doc! { "a": 1 }));
    Ok(())
}
