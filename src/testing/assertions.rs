//! Assertions over split plans and per-split outputs.

use crate::split::MongoSplit;
use crate::value::Row;

/// Assert that `splits` cover `[0, total)` exactly once, in order, with no gaps.
///
/// # Panics
///
/// Panics if a split overlaps its predecessor, leaves a gap, or the lengths do not
/// sum to `total`.
///
/// # Example
///
/// ```
/// use ironbeam_mongo::plan_splits;
/// use ironbeam_mongo::testing::assert_splits_partition;
///
/// assert_splits_partition(&plan_splits(10, 3), 10);
/// ```
pub fn assert_splits_partition(splits: &[MongoSplit], total: u64) {
    assert!(!splits.is_empty(), "a plan always has at least one split");
    let mut next = 0u64;
    for (i, split) in splits.iter().enumerate() {
        assert_eq!(
            split.skip, next,
            "split #{i} starts at {} but the previous split ended at {next}\n  Splits: {splits:?}",
            split.skip
        );
        next = split.skip + split.limit;
    }
    let covered: u64 = splits.iter().map(|s| s.limit).sum();
    assert_eq!(
        covered, total,
        "split lengths sum to {covered}, expected {total}\n  Splits: {splits:?}"
    );
}

/// Assert that no row appears in more than one split's output.
///
/// Rows are compared by value, so the column spec should include a field that is
/// unique per document (such as `_id`).
///
/// # Panics
///
/// Panics on the first row found in two different splits.
pub fn assert_rows_disjoint(per_split: &[Vec<Row>]) {
    for (i, rows) in per_split.iter().enumerate() {
        for row in rows {
            if let Some(j) = per_split[i + 1..]
                .iter()
                .position(|other| other.contains(row))
            {
                panic!(
                    "row {row:?} was read by split #{i} and split #{}",
                    i + 1 + j
                );
            }
        }
    }
}

/// Assert that every row has exactly `arity` values.
///
/// # Panics
///
/// Panics on the first row with a different arity.
pub fn assert_row_arity(rows: &[Row], arity: usize) {
    for (i, row) in rows.iter().enumerate() {
        assert_eq!(
            row.arity(),
            arity,
            "row #{i} has {} values, expected {arity}: {row:?}",
            row.arity()
        );
    }
}
