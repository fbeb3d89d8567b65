#![cfg(feature = "io-jsonl")]

use anyhow::Result;
use ironbeam_mongo::testing::{
    numbered_column_spec, numbered_documents, sample_people_column_spec, sample_people_documents,
};
use ironbeam_mongo::{read_jsonl_records, write_rows_jsonl, FakeMongoStore, MongoSource, ScanRunner};
use serde_json::json;
use std::fs;

#[test]
fn writes_one_object_per_row_keyed_by_column() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let file = tmp.path().join("nested/dir/people.jsonl");

    let store = FakeMongoStore::with_documents(sample_people_documents());
    let source = MongoSource::new(sample_people_column_spec()?, None, store.connector())?;
    let rows = ScanRunner::sequential().run_collect(&source)?;

    let n = write_rows_jsonl(&file, source.columns(), &rows)?;
    assert_eq!(n, 4);

    let records = read_jsonl_records(&file)?;
    assert_eq!(records.len(), 4);
    let first_line = fs::read_to_string(&file)?
        .lines()
        .next()
        .map(str::to_string)
        .unwrap_or_default();
    assert_eq!(
        first_line,
        r#"{"id":"64b7f0a1c2d3e4f5a6b7c8d1","name":"Ada","age":36,"score":91.5,"active":true,"joined":"2021-03-04","city":"London","tags":"math,engines"}"#
    );

    let ada = &records[0];
    assert_eq!(ada["id"], json!("64b7f0a1c2d3e4f5a6b7c8d1"));
    assert_eq!(ada["age"], json!(36));
    assert_eq!(ada["joined"], json!("2021-03-04"));
    assert_eq!(ada["tags"], json!("math,engines"));
    assert_eq!(records[3]["age"], json!(null));
    Ok(())
}

#[test]
fn empty_input_creates_empty_file() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let file = tmp.path().join("empty.jsonl");
    assert_eq!(write_rows_jsonl(&file, &numbered_column_spec()?, &[])?, 0);
    assert!(fs::read_to_string(&file)?.is_empty());
    Ok(())
}

#[cfg(feature = "parallel-io")]
#[test]
fn parallel_writer_keeps_split_order() -> Result<()> {
    use ironbeam_mongo::write_splits_jsonl_par;

    let tmp = tempfile::tempdir()?;
    let seq_file = tmp.path().join("seq.jsonl");
    let par_file = tmp.path().join("par.jsonl");

    let store = FakeMongoStore::with_documents(numbered_documents(250));
    let source = MongoSource::new(numbered_column_spec()?, None, store.connector())?;
    let per_split = ScanRunner::parallel(Some(3)).with_min_splits(6).run(&source)?;
    let flat: Vec<_> = per_split.iter().flatten().cloned().collect();

    write_rows_jsonl(&seq_file, source.columns(), &flat)?;
    let n = write_splits_jsonl_par(&par_file, source.columns(), &per_split)?;
    assert_eq!(n, 250);
    assert_eq!(fs::read_to_string(&seq_file)?, fs::read_to_string(&par_file)?);

    // part files are cleaned up
    let leftovers = fs::read_dir(tmp.path())?
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().contains(".part"))
        .count();
    assert_eq!(leftovers, 0);
    Ok(())
}
