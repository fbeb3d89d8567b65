//! Run every split of a source to completion.
//!
//! [`ScanRunner`] is a stand-in for a host engine's scheduler: it plans splits once,
//! hands each split to its own [`SplitReader`](crate::SplitReader) session, and
//! gathers the rows. Results always come back in split order, whether the sessions
//! ran one after another or on a rayon pool.

use crate::error::{ReaderError, ReaderResult};
use crate::source::MongoSource;
use crate::split::MongoSplit;
use crate::value::Row;
use rayon::prelude::*;
use tracing::debug;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecMode {
    Sequential,
    /// `threads: None` sizes the pool to the machine.
    Parallel { threads: Option<usize> },
}

#[derive(Clone, Debug)]
pub struct ScanRunner {
    pub mode: ExecMode,
    /// Split count requested from the planner.
    pub min_splits: usize,
}

impl Default for ScanRunner {
    fn default() -> Self {
        Self {
            mode: ExecMode::Parallel { threads: None },
            min_splits: 2 * num_cpus::get().max(2),
        }
    }
}

impl ScanRunner {
    #[must_use]
    pub fn sequential() -> Self {
        Self {
            mode: ExecMode::Sequential,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn parallel(threads: Option<usize>) -> Self {
        Self {
            mode: ExecMode::Parallel { threads },
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn with_min_splits(mut self, min_splits: usize) -> Self {
        self.min_splits = min_splits;
        self
    }

    /// Plan splits for `source` and read every one of them.
    ///
    /// Returns one row vector per split, in split order.
    ///
    /// # Errors
    /// Returns the planning error, or the error of the first failing split (in
    /// split order). Every other session is still closed.
    pub fn run(&self, source: &MongoSource) -> ReaderResult<Vec<Vec<Row>>> {
        let metrics = source.metrics();
        metrics.record_start();
        let splits = source.create_splits(self.min_splits)?;
        let result = self.run_splits(source, &splits);
        metrics.record_end();
        debug!(
            mode = ?self.mode,
            splits = splits.len(),
            rows = metrics.rows_read(),
            "scan finished"
        );
        result
    }

    /// Like [`run`](Self::run), with the per-split results concatenated.
    ///
    /// # Errors
    /// See [`run`](Self::run).
    pub fn run_collect(&self, source: &MongoSource) -> ReaderResult<Vec<Row>> {
        Ok(self.run(source)?.into_iter().flatten().collect())
    }

    /// Read an already planned set of splits.
    ///
    /// # Errors
    /// Returns the error of the first failing split, in split order.
    pub fn run_splits(
        &self,
        source: &MongoSource,
        splits: &[MongoSplit],
    ) -> ReaderResult<Vec<Vec<Row>>> {
        match self.mode {
            ExecMode::Sequential => splits
                .iter()
                .map(|split| source.read_split(*split))
                .collect(),
            ExecMode::Parallel { threads } => {
                let mut builder = rayon::ThreadPoolBuilder::new();
                if let Some(t) = threads {
                    builder = builder.num_threads(t.max(1));
                }
                let pool = builder.build().map_err(|e| {
                    ReaderError::read("failed to build scan thread pool").with_source(e.to_string())
                })?;
                let results: Vec<ReaderResult<Vec<Row>>> = pool.install(|| {
                    splits
                        .par_iter()
                        .map(|split| source.read_split(*split))
                        .collect()
                });
                results.into_iter().collect()
            }
        }
    }
}
