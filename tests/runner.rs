use anyhow::Result;
use ironbeam_mongo::testing::{assert_rows_disjoint, numbered_column_spec, numbered_documents};
use ironbeam_mongo::{ErrorKind, ExecMode, FakeMongoStore, MongoSource, ScanRunner};

fn source_over(n: usize) -> Result<(FakeMongoStore, MongoSource)> {
    let store = FakeMongoStore::with_documents(numbered_documents(n));
    let source = MongoSource::new(numbered_column_spec()?, None, store.connector())?;
    Ok((store, source))
}

#[test]
fn parallel_matches_sequential() -> Result<()> {
    let (_store, source) = source_over(1_003)?;
    let seq = ScanRunner::sequential().with_min_splits(9).run(&source)?;
    let par = ScanRunner::parallel(Some(4)).with_min_splits(9).run(&source)?;
    assert_eq!(seq, par);
    assert_eq!(seq.len(), 10);
    assert_rows_disjoint(&par);
    Ok(())
}

#[test]
fn run_collect_concatenates_in_split_order() -> Result<()> {
    let (_store, source) = source_over(40)?;
    let rows = ScanRunner::parallel(None).with_min_splits(7).run_collect(&source)?;
    let seqs: Vec<i64> = rows.iter().filter_map(|r| r[0].as_i64()).collect();
    assert_eq!(seqs, (0..40).collect::<Vec<_>>());
    Ok(())
}

#[test]
fn default_runner_is_parallel() {
    let runner = ScanRunner::default();
    assert_eq!(runner.mode, ExecMode::Parallel { threads: None });
    assert!(runner.min_splits >= 4);
}

#[test]
fn failing_split_fails_the_run_and_releases_everything() -> Result<()> {
    let (store, source) = source_over(100)?;
    store.fail_cursor_after(Some(3));
    let err = ScanRunner::parallel(Some(2))
        .with_min_splits(4)
        .run(&source)
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Read);
    assert_eq!(store.open_cursors(), 0);
    assert_eq!(store.live_clients(), 0);
    assert_eq!(source.connections().active_leases(), 0);
    Ok(())
}

#[test]
fn metrics_track_the_scan() -> Result<()> {
    let (_store, source) = source_over(30)?;
    ScanRunner::sequential().with_min_splits(4).run(&source)?;
    let m = source.metrics();
    assert_eq!(m.splits_planned(), 5);
    assert_eq!(m.splits_opened(), 5);
    assert_eq!(m.splits_completed(), 5);
    assert_eq!(m.splits_failed(), 0);
    assert_eq!(m.rows_read(), 30);
    assert!(m.elapsed().is_some());
    Ok(())
}
