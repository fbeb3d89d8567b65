//! Document-store seam.
//!
//! The reader never talks to a driver directly. It consumes two small, synchronous
//! traits:
//!
//! - [`StoreConnector`] acquires a client bound to one collection
//! - [`DocumentStore`] counts qualifying documents and opens bounded cursors
//!
//! Connections are shared between concurrently running readers through the
//! reference-counted [`ConnectionManager`]; see [`connection`] for the ownership
//! rules.
//!
//! ## Implementations
//!
//! - [`FakeMongoStore`] - in-memory collection for tests, with fault injection
//! - `MongoConnector` - the official MongoDB driver (feature `mongodb-driver`)
//!
//! ## Synchronous API
//! Like the rest of Ironbeam, these traits block. Implementations wrapping an async
//! driver are expected to drive it internally.

pub mod connection;
pub mod fake;
#[cfg_attr(docsrs, doc(cfg(feature = "mongodb-driver")))]
#[cfg(feature = "mongodb-driver")]
pub mod mongo;

pub use connection::{ConnectionLease, ConnectionManager};
pub use fake::{FakeConnector, FakeMongoStore};
#[cfg(feature = "mongodb-driver")]
pub use mongo::MongoConnector;

use crate::error::ReaderResult;
use bson::Document;
use std::sync::Arc;

/// Store-side iteration handle. Dropping it releases the server-side cursor.
pub type DocumentCursor = Box<dyn Iterator<Item = ReaderResult<Document>> + Send>;

/// A bounded `find` over the collection, in the store's default order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindQuery {
    pub filter: Option<Document>,
    pub skip: u64,
    pub limit: u64,
    /// Documents fetched per round trip, if the store supports batching.
    pub batch_size: Option<u32>,
}

impl FindQuery {
    #[must_use]
    pub fn new(filter: Option<Document>, skip: u64, limit: u64) -> Self {
        Self {
            filter,
            skip,
            limit,
            batch_size: None,
        }
    }

    #[must_use]
    pub const fn with_batch_size(mut self, batch_size: Option<u32>) -> Self {
        self.batch_size = batch_size;
        self
    }
}

/// A client bound to one collection.
pub trait DocumentStore: Send + Sync {
    /// Count the documents matching `filter` (all documents when `None`).
    ///
    /// # Errors
    ///
    /// Returns an error if the collection cannot be reached or the filter is rejected
    fn count_documents(&self, filter: Option<&Document>) -> ReaderResult<u64>;

    /// Open a cursor over `query.filter`, skipping `query.skip` documents and
    /// returning at most `query.limit`.
    ///
    /// # Errors
    ///
    /// Returns an error if the query cannot be issued; failures while iterating are
    /// reported through the cursor items instead
    fn find(&self, query: &FindQuery) -> ReaderResult<DocumentCursor>;
}

/// Acquires store clients. Called lazily by the [`ConnectionManager`].
pub trait StoreConnector: Send + Sync {
    /// Establish a new client.
    ///
    /// # Errors
    ///
    /// Returns a connection error if the store cannot be reached or authenticated
    fn connect(&self) -> ReaderResult<Arc<dyn DocumentStore>>;

    /// Human-readable target used in log events (never includes credentials).
    fn describe(&self) -> String;
}
