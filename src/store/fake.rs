//! In-memory fake of a MongoDB collection.
//!
//! [`FakeMongoStore`] keeps documents in insertion order, which stands in for the
//! store's default iteration order. It understands a useful subset of the query
//! language (`$eq`, `$ne`, `$gt`, `$gte`, `$lt`, `$lte`, `$in`, `$nin`, `$exists`,
//! `$and`, `$or`, plus implicit equality and array membership) and can inject faults
//! so that connection and mid-scan read failures can be tested without a server.
//!
//! Connections are made through [`FakeConnector`]; each connect hands out a fresh
//! client whose lifetime is tracked, so tests can assert that clients and cursors are
//! released.

use crate::convert::lookup_path;
use crate::error::{ReaderError, ReaderResult};
use crate::store::{DocumentCursor, DocumentStore, FindQuery, StoreConnector};
use bson::{Bson, Document};
use std::cmp::Ordering as CmpOrdering;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct FakeState {
    documents: Vec<Document>,
    refuse_connections: bool,
    fail_cursor_after: Option<usize>,
    ignore_limit: bool,
}

#[derive(Default)]
struct FakeCounters {
    connects: AtomicUsize,
    live_clients: AtomicUsize,
    open_cursors: AtomicUsize,
    finds: AtomicUsize,
}

// ============================================================================
// FakeMongoStore
// ============================================================================

#[derive(Clone, Default)]
pub struct FakeMongoStore {
    state: Arc<Mutex<FakeState>>,
    counters: Arc<FakeCounters>,
}

impl FakeMongoStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_documents(documents: Vec<Document>) -> Self {
        let store = Self::new();
        store.insert_many(documents);
        store
    }

    /// Append a document at the end of the default iteration order.
    ///
    /// # Panics
    ///
    /// Panics if the state mutex is poisoned
    pub fn insert(&self, document: Document) {
        self.state
            .lock()
            .expect("state mutex poisoned")
            .documents
            .push(document);
    }

    /// # Panics
    ///
    /// Panics if the state mutex is poisoned
    pub fn insert_many(&self, documents: impl IntoIterator<Item = Document>) {
        self.state
            .lock()
            .expect("state mutex poisoned")
            .documents
            .extend(documents);
    }

    /// # Panics
    ///
    /// Panics if the state mutex is poisoned
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().expect("state mutex poisoned").documents.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Make every subsequent connect attempt fail with a connection error.
    ///
    /// # Panics
    ///
    /// Panics if the state mutex is poisoned
    pub fn refuse_connections(&self, refuse: bool) {
        self.state.lock().expect("state mutex poisoned").refuse_connections = refuse;
    }

    /// Make every cursor opened from now on fail after yielding `n` documents.
    ///
    /// # Panics
    ///
    /// Panics if the state mutex is poisoned
    pub fn fail_cursor_after(&self, n: Option<usize>) {
        self.state.lock().expect("state mutex poisoned").fail_cursor_after = n;
    }

    /// Simulate a store that does not honor `limit`, returning everything after `skip`.
    ///
    /// # Panics
    ///
    /// Panics if the state mutex is poisoned
    pub fn ignore_limit(&self, ignore: bool) {
        self.state.lock().expect("state mutex poisoned").ignore_limit = ignore;
    }

    /// Connector handing out tracked clients over this collection.
    #[must_use]
    pub fn connector(&self) -> Arc<dyn StoreConnector> {
        Arc::new(FakeConnector {
            store: self.clone(),
        })
    }

    /// Total number of successful connects.
    #[must_use]
    pub fn connect_count(&self) -> usize {
        self.counters.connects.load(Ordering::SeqCst)
    }

    /// Clients handed out by the connector that have not been dropped yet.
    #[must_use]
    pub fn live_clients(&self) -> usize {
        self.counters.live_clients.load(Ordering::SeqCst)
    }

    /// Cursors opened by `find` that have not been dropped yet.
    #[must_use]
    pub fn open_cursors(&self) -> usize {
        self.counters.open_cursors.load(Ordering::SeqCst)
    }

    /// Total number of `find` calls issued.
    #[must_use]
    pub fn find_count(&self) -> usize {
        self.counters.finds.load(Ordering::SeqCst)
    }

    fn matching(&self, filter: Option<&Document>) -> ReaderResult<Vec<Document>> {
        let state = self.state.lock().expect("state mutex poisoned");
        let mut out = Vec::new();
        for doc in &state.documents {
            if filter.map_or(Ok(true), |f| matches_filter(doc, f))? {
                out.push(doc.clone());
            }
        }
        drop(state);
        Ok(out)
    }
}

impl DocumentStore for FakeMongoStore {
    fn count_documents(&self, filter: Option<&Document>) -> ReaderResult<u64> {
        Ok(self.matching(filter)?.len() as u64)
    }

    fn find(&self, query: &FindQuery) -> ReaderResult<DocumentCursor> {
        let matching = self.matching(query.filter.as_ref())?;
        let (fail_after, ignore_limit) = {
            let state = self.state.lock().expect("state mutex poisoned");
            (state.fail_cursor_after, state.ignore_limit)
        };

        let skip = usize::try_from(query.skip).unwrap_or(usize::MAX);
        // MongoDB treats limit 0 as "no limit".
        let take = if query.limit == 0 || ignore_limit {
            usize::MAX
        } else {
            usize::try_from(query.limit).unwrap_or(usize::MAX)
        };
        let window: Vec<Document> = matching.into_iter().skip(skip).take(take).collect();

        self.counters.finds.fetch_add(1, Ordering::SeqCst);
        self.counters.open_cursors.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeCursor {
            docs: window.into_iter(),
            yielded: 0,
            fail_after,
            failed: false,
            counters: Arc::clone(&self.counters),
        }))
    }
}

// ============================================================================
// FakeConnector
// ============================================================================

pub struct FakeConnector {
    store: FakeMongoStore,
}

impl StoreConnector for FakeConnector {
    fn connect(&self) -> ReaderResult<Arc<dyn DocumentStore>> {
        let refused = self
            .store
            .state
            .lock()
            .expect("state mutex poisoned")
            .refuse_connections;
        if refused {
            return Err(ReaderError::connection("fake store refused the connection"));
        }
        self.store.counters.connects.fetch_add(1, Ordering::SeqCst);
        self.store.counters.live_clients.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(FakeClient {
            store: self.store.clone(),
        }))
    }

    fn describe(&self) -> String {
        "fake://in-memory".to_string()
    }
}

struct FakeClient {
    store: FakeMongoStore,
}

impl DocumentStore for FakeClient {
    fn count_documents(&self, filter: Option<&Document>) -> ReaderResult<u64> {
        self.store.count_documents(filter)
    }

    fn find(&self, query: &FindQuery) -> ReaderResult<DocumentCursor> {
        self.store.find(query)
    }
}

impl Drop for FakeClient {
    fn drop(&mut self) {
        self.store.counters.live_clients.fetch_sub(1, Ordering::SeqCst);
    }
}

struct FakeCursor {
    docs: std::vec::IntoIter<Document>,
    yielded: usize,
    fail_after: Option<usize>,
    failed: bool,
    counters: Arc<FakeCounters>,
}

impl Iterator for FakeCursor {
    type Item = ReaderResult<Document>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        if self.fail_after == Some(self.yielded) {
            self.failed = true;
            return Some(Err(ReaderError::read(format!(
                "simulated cursor failure after {} documents",
                self.yielded
            ))));
        }
        let doc = self.docs.next()?;
        self.yielded += 1;
        Some(Ok(doc))
    }
}

impl Drop for FakeCursor {
    fn drop(&mut self) {
        self.counters.open_cursors.fetch_sub(1, Ordering::SeqCst);
    }
}

// ============================================================================
// Query matching
// ============================================================================

fn matches_filter(doc: &Document, filter: &Document) -> ReaderResult<bool> {
    for (key, cond) in filter {
        let ok = match key.as_str() {
            "$and" => {
                let mut all = true;
                for sub in sub_filters(key, cond)? {
                    all &= matches_filter(doc, sub)?;
                }
                all
            }
            "$or" => {
                let mut any = false;
                for sub in sub_filters(key, cond)? {
                    any |= matches_filter(doc, sub)?;
                }
                any
            }
            op if op.starts_with('$') => return Err(unsupported(op)),
            path => field_matches(lookup_path(doc, path), cond)?,
        };
        if !ok {
            return Ok(false);
        }
    }
    Ok(true)
}

fn sub_filters<'a>(op: &str, cond: &'a Bson) -> ReaderResult<Vec<&'a Document>> {
    let Bson::Array(items) = cond else {
        return Err(ReaderError::read(format!("{op} expects an array")));
    };
    items
        .iter()
        .map(|item| match item {
            Bson::Document(d) => Ok(d),
            _ => Err(ReaderError::read(format!("{op} expects an array of documents"))),
        })
        .collect()
}

fn field_matches(value: Option<&Bson>, cond: &Bson) -> ReaderResult<bool> {
    let operators = match cond {
        Bson::Document(d) if !d.is_empty() && d.keys().all(|k| k.starts_with('$')) => d,
        _ => return Ok(equals(value, cond)),
    };
    for (op, arg) in operators {
        let ok = match op.as_str() {
            "$eq" => equals(value, arg),
            "$ne" => !equals(value, arg),
            "$gt" => ordered(value, arg, |o| o == CmpOrdering::Greater),
            "$gte" => ordered(value, arg, |o| o != CmpOrdering::Less),
            "$lt" => ordered(value, arg, |o| o == CmpOrdering::Less),
            "$lte" => ordered(value, arg, |o| o != CmpOrdering::Greater),
            "$in" => in_list(op, value, arg)?,
            "$nin" => !in_list(op, value, arg)?,
            "$exists" => arg.as_bool().unwrap_or(true) == value.is_some(),
            other => return Err(unsupported(other)),
        };
        if !ok {
            return Ok(false);
        }
    }
    Ok(true)
}

fn unsupported(op: &str) -> ReaderError {
    ReaderError::read(format!("fake store does not support query operator {op}"))
}

fn equals(value: Option<&Bson>, target: &Bson) -> bool {
    match value {
        None => matches!(target, Bson::Null),
        Some(Bson::Array(items)) if !matches!(target, Bson::Array(_)) => items
            .iter()
            .any(|item| compare(item, target) == Some(CmpOrdering::Equal)),
        Some(v) => compare(v, target) == Some(CmpOrdering::Equal),
    }
}

fn ordered(value: Option<&Bson>, arg: &Bson, accept: impl Fn(CmpOrdering) -> bool) -> bool {
    value.and_then(|v| compare(v, arg)).is_some_and(accept)
}

fn in_list(op: &str, value: Option<&Bson>, arg: &Bson) -> ReaderResult<bool> {
    let Bson::Array(options) = arg else {
        return Err(ReaderError::read(format!("{op} expects an array")));
    };
    Ok(options.iter().any(|o| equals(value, o)))
}

fn as_f64(v: &Bson) -> Option<f64> {
    match v {
        Bson::Int32(i) => Some(f64::from(*i)),
        Bson::Int64(i) => Some(*i as f64),
        Bson::Double(d) => Some(*d),
        _ => None,
    }
}

fn compare(a: &Bson, b: &Bson) -> Option<CmpOrdering> {
    if let (Some(x), Some(y)) = (as_f64(a), as_f64(b)) {
        return x.partial_cmp(&y);
    }
    match (a, b) {
        (Bson::String(x), Bson::String(y)) => Some(x.cmp(y)),
        (Bson::Boolean(x), Bson::Boolean(y)) => Some(x.cmp(y)),
        (Bson::DateTime(x), Bson::DateTime(y)) => Some(x.timestamp_millis().cmp(&y.timestamp_millis())),
        (Bson::ObjectId(x), Bson::ObjectId(y)) => Some(x.bytes().cmp(&y.bytes())),
        _ if a == b => Some(CmpOrdering::Equal),
        _ => None,
    }
}
