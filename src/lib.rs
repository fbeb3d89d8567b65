//! # ironbeam-mongo
//!
//! A **split-parallel MongoDB source** for batch pipelines. It reads a (optionally
//! filtered) collection, partitions the qualifying documents into independent
//! `(skip, limit)` splits, and converts every document into a fixed-schema [`Row`].
//!
//! ## Key Features
//!
//! - **Split planning** - deterministic partitioning of a document count into disjoint ranges
//! - **Per-split readers** - `open → has_next/next_row → close` with guaranteed release on drop
//! - **Typed rows** - documents resolved by field path and coerced to declared column types
//! - **Shared connections** - reference-counted leases, so closing one split never severs another
//! - **Sequential and parallel execution** - the bundled [`ScanRunner`] runs splits on rayon
//! - **In-memory store** - [`FakeMongoStore`] for tests, with fault injection
//! - **Real driver** - `MongoConnector` behind the `mongodb-driver` feature
//! - **Export** - JSON Lines output keyed by column name (feature `io-jsonl`)
//!
//! ## Quick Start
//!
//! ```
//! use ironbeam_mongo::*;
//! use bson::doc;
//! # use anyhow::Result;
//!
//! # fn main() -> Result<()> {
//! let store = FakeMongoStore::with_documents(
//!     (0..100).map(|i| doc! { "seq": i, "even": i % 2 == 0 }).collect(),
//! );
//!
//! let config = MongoReaderConfig::from_json_str(r#"{
//!     "hostPorts": "localhost:27017",
//!     "database": "shop",
//!     "collectionName": "events",
//!     "column": [
//!         { "name": "seq", "type": "long" },
//!         { "name": "even", "type": "boolean" }
//!     ],
//!     "filter": "{\"even\": true}"
//! }"#)?;
//!
//! let source = MongoSource::from_config(&config, store.connector())?;
//! let rows = ScanRunner::parallel(Some(4)).with_min_splits(8).run_collect(&source)?;
//! assert_eq!(rows.len(), 50);
//! # Ok(())
//! # }
//! ```
//!
//! ## Core Concepts
//!
//! ### Splits
//!
//! [`plan_splits`] turns a qualifying document count into [`MongoSplit`]s that cover
//! `[0, total)` exactly once. [`MongoSource::create_splits`] counts through the store
//! and plans in one step.
//!
//! ### Readers
//!
//! A [`SplitReader`] owns one split's cursor and connection lease. It is also an
//! `Iterator<Item = ReaderResult<Row>>`.
//!
//! ### Errors
//!
//! Every failure is a [`ReaderError`] tagged with an [`ErrorKind`]: configuration,
//! connection, read, or conversion. Nothing is swallowed.
//!
//! ## Consistency
//!
//! Splits are computed from a count taken at planning time. Documents inserted or
//! deleted while the scan runs may be skipped or read twice; there is no snapshot
//! isolation across splits.
//!
//! ## Module Overview
//!
//! - [`split`] - Split type and planner
//! - [`filter`] - Filter text to query document
//! - [`schema`] - Column descriptors and specs
//! - [`convert`] - Document to row conversion
//! - [`reader`] - Per-split reader lifecycle
//! - [`source`] - Configured entry point
//! - [`store`] - Store traits, connection leases, fake and real stores
//! - [`runner`] - Sequential and parallel scan execution
//! - [`io`] - JSON Lines export
//! - [`testing`] - Fixtures and assertions

pub mod config;
pub mod convert;
pub mod error;
pub mod filter;
pub mod io;
pub mod metrics;
pub mod reader;
pub mod runner;
pub mod schema;
pub mod source;
pub mod split;
pub mod store;
pub mod testing;
pub mod value;

pub use config::MongoReaderConfig;
pub use convert::RowConverter;
pub use error::{ErrorKind, IntoReaderError, ReaderError, ReaderResult};
pub use filter::build_filter;
pub use metrics::ScanMetrics;
pub use reader::{ReaderState, SplitReader};
pub use runner::{ExecMode, ScanRunner};
pub use schema::{ColumnDescriptor, ColumnSpec, ColumnType};
pub use source::MongoSource;
pub use split::{plan_splits, MongoSplit};
pub use store::{
    ConnectionLease, ConnectionManager, DocumentCursor, DocumentStore, FakeConnector,
    FakeMongoStore, FindQuery, StoreConnector,
};
pub use value::{Row, Value};

#[cfg(feature = "mongodb-driver")]
pub use store::MongoConnector;

#[cfg(feature = "io-jsonl")]
pub use io::jsonl::{read_jsonl_records, write_rows_jsonl};

#[cfg(all(feature = "io-jsonl", feature = "parallel-io"))]
pub use io::jsonl::write_splits_jsonl_par;
