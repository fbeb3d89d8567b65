//! Testing utilities for code that reads through a [`MongoSource`](crate::MongoSource).
//!
//! - **Fixtures**: deterministic document sets and a matching column spec
//! - **Assertions**: check that planned splits partition a range and that split
//!   outputs do not overlap
//!
//! Combine them with [`FakeMongoStore`](crate::FakeMongoStore) to exercise a whole
//! scan without a running database:
//!
//! ```
//! use ironbeam_mongo::*;
//! use ironbeam_mongo::testing::*;
//!
//! # fn main() -> anyhow::Result<()> {
//! let store = FakeMongoStore::with_documents(numbered_documents(10));
//! let source = MongoSource::new(numbered_column_spec()?, None, store.connector())?;
//!
//! let splits = source.create_splits(3)?;
//! assert_splits_partition(&splits, 10);
//!
//! let per_split = ScanRunner::sequential().run_splits(&source, &splits)?;
//! assert_rows_disjoint(&per_split);
//! # Ok(())
//! # }
//! ```

pub mod assertions;
pub mod fixtures;

pub use assertions::*;
pub use fixtures::*;
