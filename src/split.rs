//! Split planning: partition a qualifying document count into `(skip, limit)` windows.
//!
//! MongoDB collections have no native partition key the reader can rely on, so a scan
//! is partitioned positionally: count the documents matching the filter, then cut the
//! store's default iteration order into contiguous windows that a `find` can address
//! with `skip` and `limit`.
//!
//! # Notes
//! - Planning is pure arithmetic and deterministic for a given `(total, min_splits)`.
//! - The count is taken once; documents written between planning and reading may be
//!   skipped or read twice. Positional splits do not try to reconcile that.

use serde::{Deserialize, Serialize};
use std::ops::Range;

/// One contiguous window of the filter-qualified document sequence.
///
/// A split is created by [`plan_splits`], handed to exactly one reader, and never
/// mutated afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MongoSplit {
    /// Number of qualifying documents to skip before the window starts.
    pub skip: u64,
    /// Maximum number of documents in the window.
    pub limit: u64,
}

impl MongoSplit {
    #[must_use]
    pub const fn new(skip: u64, limit: u64) -> Self {
        Self { skip, limit }
    }

    /// Half-open document range `[skip, skip + limit)` covered by this split.
    #[must_use]
    pub const fn range(&self) -> Range<u64> {
        self.skip..self.skip + self.limit
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.limit == 0
    }
}

/// Partition `total` qualifying documents into at least `min_splits` windows.
///
/// - `total <= min_splits` yields a single split `(0, total)`; this includes the
///   empty collection, which still gets one (empty) unit of work.
/// - Otherwise `min_splits` splits of `total / min_splits` documents are produced,
///   followed by one remainder split when the division is not exact.
///
/// A `min_splits` of zero is treated as one.
///
/// ```
/// use ironbeam_mongo::{plan_splits, MongoSplit};
///
/// let splits = plan_splits(10, 3);
/// assert_eq!(
///     splits,
///     vec![
///         MongoSplit::new(0, 3),
///         MongoSplit::new(3, 3),
///         MongoSplit::new(6, 3),
///         MongoSplit::new(9, 1),
///     ]
/// );
/// ```
#[must_use]
pub fn plan_splits(total: u64, min_splits: usize) -> Vec<MongoSplit> {
    let wanted = min_splits.max(1) as u64;
    if total <= wanted {
        return vec![MongoSplit::new(0, total)];
    }

    let base = total / wanted;
    let mut splits: Vec<MongoSplit> = (0..wanted)
        .map(|i| MongoSplit::new(i * base, base))
        .collect();

    let covered = base * wanted;
    if covered < total {
        splits.push(MongoSplit::new(covered, total - covered));
    }
    splits
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_is_half_open() {
        let s = MongoSplit::new(4, 3);
        assert_eq!(s.range(), 4..7);
        assert!(!s.is_empty());
        assert!(MongoSplit::new(0, 0).is_empty());
    }

    #[test]
    fn test_zero_min_splits_behaves_like_one() {
        assert_eq!(plan_splits(7, 0), vec![MongoSplit::new(0, 7)]);
    }
}
