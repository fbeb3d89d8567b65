//! The configured entry point for a collection scan.
//!
//! A [`MongoSource`] is built once from a [`MongoReaderConfig`] (or directly from a
//! column spec, filter text and connector). Everything that can be wrong with the
//! configuration is reported at construction time, before any split is planned.
//!
//! ```
//! use ironbeam_mongo::*;
//! use bson::doc;
//!
//! # fn main() -> anyhow::Result<()> {
//! let store = FakeMongoStore::with_documents(vec![
//!     doc! { "name": "ada", "age": 36 },
//!     doc! { "name": "alan", "age": 41 },
//!     doc! { "name": "grace", "age": 85 },
//! ]);
//! let columns = ColumnSpec::new(vec![
//!     ColumnDescriptor::new("name", ColumnType::String),
//!     ColumnDescriptor::new("age", ColumnType::Long),
//! ])?;
//! let source = MongoSource::new(columns, Some(r#"{"age": {"$gt": 40}}"#), store.connector())?;
//!
//! let mut rows = Vec::new();
//! for split in source.create_splits(2)? {
//!     rows.extend(source.read_split(split)?);
//! }
//! assert_eq!(rows.len(), 2);
//! # Ok(())
//! # }
//! ```

use crate::config::MongoReaderConfig;
use crate::convert::RowConverter;
use crate::error::ReaderResult;
use crate::filter::build_filter;
use crate::metrics::ScanMetrics;
use crate::reader::SplitReader;
use crate::schema::ColumnSpec;
use crate::split::{plan_splits, MongoSplit};
use crate::store::{ConnectionManager, StoreConnector};
use crate::value::Row;
use bson::Document;
use std::sync::Arc;
use tracing::{debug, warn};

/// Immutable scan definition shared by the planner and every reader.
#[derive(Clone)]
pub struct MongoSource {
    connections: ConnectionManager,
    converter: RowConverter,
    filter: Option<Arc<Document>>,
    batch_size: Option<u32>,
    metrics: ScanMetrics,
}

impl MongoSource {
    /// Build a source from explicit parts.
    ///
    /// # Errors
    /// Returns a configuration error if `filter` is not a valid query document.
    pub fn new(
        columns: ColumnSpec,
        filter: Option<&str>,
        connector: Arc<dyn StoreConnector>,
    ) -> ReaderResult<Self> {
        let filter = build_filter(filter)?.map(Arc::new);
        Ok(Self {
            connections: ConnectionManager::new(connector),
            converter: RowConverter::new(columns),
            filter,
            batch_size: None,
            metrics: ScanMetrics::new(),
        })
    }

    /// Build a source from a reader config, reading through `connector`.
    ///
    /// # Errors
    /// Returns a configuration error if the config does not validate or its filter
    /// does not parse.
    pub fn from_config(
        config: &MongoReaderConfig,
        connector: Arc<dyn StoreConnector>,
    ) -> ReaderResult<Self> {
        config.validate()?;
        let source = Self::new(config.column_spec()?, config.filter.as_deref(), connector)?;
        Ok(source.with_batch_size(config.fetch_size))
    }

    /// Build a source that talks to a live MongoDB deployment.
    ///
    /// # Errors
    /// Returns a configuration error if the config does not validate.
    #[cfg(feature = "mongodb-driver")]
    pub fn connect(config: &MongoReaderConfig) -> ReaderResult<Self> {
        let connector = crate::store::MongoConnector::new(config.clone())?;
        Self::from_config(config, Arc::new(connector))
    }

    #[must_use]
    pub const fn with_batch_size(mut self, batch_size: Option<u32>) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Replace the metrics handle, e.g. to share one across several sources.
    #[must_use]
    pub fn with_metrics(mut self, metrics: ScanMetrics) -> Self {
        self.metrics = metrics;
        self
    }

    /// Count the qualifying documents and partition them into splits.
    ///
    /// # Errors
    /// Returns a connection error if the store cannot be reached, or the store's
    /// error if the count fails.
    pub fn create_splits(&self, min_splits: usize) -> ReaderResult<Vec<MongoSplit>> {
        let total = {
            let lease = self.connections.acquire()?;
            lease
                .count_documents(self.filter.as_deref())
                .inspect_err(|e| warn!(error = %e, "failed to count documents"))?
        };
        let splits = plan_splits(total, min_splits);
        self.metrics.record_plan(splits.len());
        debug!(
            target_store = %self.connections.describe(),
            total,
            min_splits,
            splits = splits.len(),
            "planned splits"
        );
        Ok(splits)
    }

    /// A fresh, unopened reader bound to this source.
    #[must_use]
    pub fn create_reader(&self) -> SplitReader {
        SplitReader::new(
            self.connections.clone(),
            self.converter.clone(),
            self.filter.clone(),
        )
        .with_batch_size(self.batch_size)
        .with_metrics(self.metrics.clone())
    }

    /// Run one reader over `split` from open to close and collect its rows.
    ///
    /// # Errors
    /// Returns the first error raised while opening the split or reading from it.
    pub fn read_split(&self, split: MongoSplit) -> ReaderResult<Vec<Row>> {
        let mut reader = self.create_reader();
        reader.open(split)?;
        let rows = reader.by_ref().collect::<ReaderResult<Vec<_>>>()?;
        reader.close();
        Ok(rows)
    }

    #[must_use]
    pub const fn connections(&self) -> &ConnectionManager {
        &self.connections
    }

    #[must_use]
    pub const fn columns(&self) -> &ColumnSpec {
        self.converter.columns()
    }

    #[must_use]
    pub fn filter(&self) -> Option<&Document> {
        self.filter.as_deref()
    }

    #[must_use]
    pub const fn metrics(&self) -> &ScanMetrics {
        &self.metrics
    }
}
