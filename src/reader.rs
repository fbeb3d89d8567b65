//! Per-split read session.
//!
//! A [`SplitReader`] walks one [`MongoSplit`] through its lifecycle:
//!
//! ```text
//! Unopened --open--> Open --(window spent / cursor drained)--> Exhausted
//!     \                 \                                          /
//!      `-------------------------- close ------------------------'--> Closed
//! ```
//!
//! The reader owns the cursor and a [`ConnectionLease`] for as long as it is open.
//! Both are released by [`close`](SplitReader::close), which is idempotent and also
//! runs on `Drop`, so early returns and panics still release store resources.
//!
//! Row order within a split is the store's default order restricted to the window.
//! The reader enforces the window itself: once `limit` rows were produced
//! [`has_next`](SplitReader::has_next) is false even if the store keeps returning
//! documents.

use crate::convert::RowConverter;
use crate::error::{ErrorKind, ReaderError, ReaderResult};
use crate::metrics::ScanMetrics;
use crate::split::MongoSplit;
use crate::store::{ConnectionLease, ConnectionManager, DocumentCursor, FindQuery};
use crate::value::Row;
use bson::Document;
use std::iter::Peekable;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderState {
    Unopened,
    Open,
    Exhausted,
    Closed,
}

struct Session {
    split: MongoSplit,
    /// `None` for an empty split, which never touches the store.
    cursor: Option<Peekable<DocumentCursor>>,
    remaining: u64,
    produced: u64,
    failed: bool,
    _lease: Option<ConnectionLease>,
}

/// Reads one split. Not shared between threads; every worker owns its own reader.
pub struct SplitReader {
    connections: ConnectionManager,
    converter: RowConverter,
    filter: Option<Arc<Document>>,
    batch_size: Option<u32>,
    metrics: Option<ScanMetrics>,
    state: ReaderState,
    assigned: Option<MongoSplit>,
    session: Option<Session>,
}

impl SplitReader {
    pub fn new(
        connections: ConnectionManager,
        converter: RowConverter,
        filter: Option<Arc<Document>>,
    ) -> Self {
        Self {
            connections,
            converter,
            filter,
            batch_size: None,
            metrics: None,
            state: ReaderState::Unopened,
            assigned: None,
            session: None,
        }
    }

    #[must_use]
    pub const fn with_batch_size(mut self, batch_size: Option<u32>) -> Self {
        self.batch_size = batch_size;
        self
    }

    #[must_use]
    pub fn with_metrics(mut self, metrics: ScanMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    #[must_use]
    pub const fn state(&self) -> ReaderState {
        self.state
    }

    /// Split currently (or last) assigned to this reader. Kept after `close`.
    #[must_use]
    pub const fn split(&self) -> Option<MongoSplit> {
        self.assigned
    }

    /// Acquire a connection and open a cursor over the split's window.
    ///
    /// # Errors
    /// - [`ErrorKind::Read`] if the reader was already opened or closed
    /// - [`ErrorKind::Connection`] if no connection could be acquired
    /// - any error the store reports while opening the cursor
    pub fn open(&mut self, split: MongoSplit) -> ReaderResult<()> {
        if self.state != ReaderState::Unopened {
            return Err(ReaderError::read(format!(
                "cannot open split ({}, {}): reader is {:?}",
                split.skip, split.limit, self.state
            )));
        }

        let session = self.start_session(split).inspect_err(|e| {
            if let Some(m) = &self.metrics {
                m.split_failed(false);
            }
            warn!(skip = split.skip, limit = split.limit, error = %e, "failed to open split");
        })?;

        self.session = Some(session);
        self.assigned = Some(split);
        self.state = ReaderState::Open;
        if let Some(m) = &self.metrics {
            m.split_opened();
        }
        debug!(skip = split.skip, limit = split.limit, "opened split");
        Ok(())
    }

    fn start_session(&self, split: MongoSplit) -> ReaderResult<Session> {
        if split.is_empty() {
            return Ok(Session {
                split,
                cursor: None,
                remaining: 0,
                produced: 0,
                failed: false,
                _lease: None,
            });
        }
        let lease = self.connections.acquire()?;
        let query = FindQuery::new(self.filter.as_deref().cloned(), split.skip, split.limit)
            .with_batch_size(self.batch_size);
        let cursor = lease.find(&query)?;
        Ok(Session {
            split,
            cursor: Some(cursor.peekable()),
            remaining: split.limit,
            produced: 0,
            failed: false,
            _lease: Some(lease),
        })
    }

    /// Whether another row can be read from the split. Never advances the window.
    pub fn has_next(&mut self) -> bool {
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        if self.state != ReaderState::Open {
            return false;
        }
        let more = !session.failed
            && session.remaining > 0
            && session.cursor.as_mut().is_some_and(|c| c.peek().is_some());
        if !more && !session.failed {
            self.state = ReaderState::Exhausted;
            if let Some(m) = &self.metrics {
                m.split_completed();
            }
            debug!(
                skip = session.split.skip,
                limit = session.split.limit,
                rows = session.produced,
                "split exhausted"
            );
        }
        more
    }

    /// Host-engine spelling of `!has_next()`.
    pub fn reached_end(&mut self) -> bool {
        !self.has_next()
    }

    /// Pull and convert the next document.
    ///
    /// # Errors
    /// - [`ErrorKind::Read`] if called while [`has_next`](Self::has_next) is false, or
    ///   if the cursor fails
    /// - [`ErrorKind::Conversion`] if the document does not fit the column spec
    pub fn next_row(&mut self) -> ReaderResult<Row> {
        if !self.has_next() {
            return Err(ReaderError::read(match self.state {
                ReaderState::Unopened => "next_row called before open",
                ReaderState::Closed => "next_row called after close",
                ReaderState::Open => "next_row called after a read failure",
                ReaderState::Exhausted => "next_row called past the end of the split",
            }));
        }
        let session = self
            .session
            .as_mut()
            .ok_or_else(|| ReaderError::read("reader has no open session"))?;
        let item = session
            .cursor
            .as_mut()
            .and_then(Iterator::next)
            .ok_or_else(|| ReaderError::read("cursor ended while a document was pending"))?;
        session.remaining -= 1;

        let converted = item.and_then(|doc| self.converter.convert(&doc));
        match converted {
            Ok(row) => {
                session.produced += 1;
                if let Some(m) = &self.metrics {
                    m.row_read();
                }
                Ok(row)
            }
            Err(e) => {
                session.failed = true;
                if let Some(m) = &self.metrics {
                    m.split_failed(e.kind == ErrorKind::Conversion);
                }
                warn!(
                    skip = session.split.skip,
                    limit = session.split.limit,
                    after_rows = session.produced,
                    error = %e,
                    "split read failed"
                );
                Err(e)
            }
        }
    }

    /// Release the cursor and connection lease. Safe to call in any state, any
    /// number of times.
    pub fn close(&mut self) {
        if self.state == ReaderState::Closed {
            return;
        }
        if let Some(session) = self.session.take() {
            debug!(
                skip = session.split.skip,
                limit = session.split.limit,
                rows = session.produced,
                "closed split"
            );
        }
        self.state = ReaderState::Closed;
    }
}

impl Iterator for SplitReader {
    type Item = ReaderResult<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.has_next() {
            Some(self.next_row())
        } else {
            None
        }
    }
}

impl Drop for SplitReader {
    fn drop(&mut self) {
        self.close();
    }
}
