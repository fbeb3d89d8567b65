use ironbeam_mongo::testing::*;
use ironbeam_mongo::{plan_splits, MongoSplit, Row, Value};

#[test]
fn fixtures_are_consistent() -> anyhow::Result<()> {
    let docs = numbered_documents(3);
    assert_eq!(docs.len(), 3);
    assert_eq!(docs[1].get_str("label")?, "doc-1");
    assert_eq!(numbered_column_spec()?.len(), 2);
    assert_eq!(sample_people_documents().len(), 4);
    assert_eq!(sample_people_column_spec()?.len(), 8);
    Ok(())
}

#[test]
fn partition_assertion_accepts_planner_output() {
    assert_splits_partition(&plan_splits(1_000, 7), 1_000);
}

#[test]
#[should_panic(expected = "starts at")]
fn partition_assertion_catches_gaps() {
    assert_splits_partition(&[MongoSplit::new(0, 3), MongoSplit::new(4, 3)], 6);
}

#[test]
#[should_panic(expected = "sum to")]
fn partition_assertion_catches_short_cover() {
    assert_splits_partition(&[MongoSplit::new(0, 3)], 4);
}

#[test]
#[should_panic(expected = "was read by split #0 and split #2")]
fn disjoint_assertion_catches_duplicates() {
    let row = |i: i64| Row::new(vec![Value::Long(i)]);
    assert_rows_disjoint(&[vec![row(1), row(2)], vec![row(3)], vec![row(2)]]);
}

#[test]
#[should_panic(expected = "expected 2")]
fn arity_assertion_catches_short_rows() {
    assert_row_arity(&[Row::new(vec![Value::Null])], 2);
}
