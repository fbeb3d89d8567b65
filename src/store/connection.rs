//! Reference-counted connection ownership.
//!
//! Every reader session takes a [`ConnectionLease`] when it opens and drops it when it
//! closes. Leases share one client (`Arc<dyn DocumentStore>`); the manager itself only
//! keeps a `Weak` handle, so the client is released exactly when the last lease goes
//! away and re-established by the next [`ConnectionManager::acquire`]. One session
//! closing can therefore never sever a connection another session is still reading
//! from.

use crate::error::ReaderResult;
use crate::store::{DocumentStore, StoreConnector};
use std::fmt;
use std::ops::Deref;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Weak};
use tracing::debug;

/// Shares one lazily created client between concurrent sessions.
#[derive(Clone)]
pub struct ConnectionManager {
    inner: Arc<ManagerInner>,
}

struct ManagerInner {
    connector: Arc<dyn StoreConnector>,
    client: Mutex<Option<Weak<dyn DocumentStore>>>,
    active: AtomicUsize,
}

impl ConnectionManager {
    pub fn new(connector: Arc<dyn StoreConnector>) -> Self {
        Self {
            inner: Arc::new(ManagerInner {
                connector,
                client: Mutex::new(None),
                active: AtomicUsize::new(0),
            }),
        }
    }

    /// Take a lease on the shared client, connecting first if no lease is alive.
    ///
    /// # Errors
    ///
    /// Returns the connector's error if a new client has to be created and cannot be
    ///
    /// # Panics
    ///
    /// Panics if the client mutex is poisoned
    pub fn acquire(&self) -> ReaderResult<ConnectionLease> {
        let mut slot = self.inner.client.lock().expect("client mutex poisoned");
        let store = match slot.as_ref().and_then(Weak::upgrade) {
            Some(live) => live,
            None => {
                let fresh = self.inner.connector.connect()?;
                debug!(target_store = %self.inner.connector.describe(), "connected to store");
                *slot = Some(Arc::downgrade(&fresh));
                fresh
            }
        };
        // Counted under the lock so `active_leases` never under-reports a live client.
        self.inner.active.fetch_add(1, Ordering::SeqCst);
        drop(slot);
        Ok(ConnectionLease {
            store,
            manager: Arc::clone(&self.inner),
        })
    }

    /// Number of leases currently alive.
    #[must_use]
    pub fn active_leases(&self) -> usize {
        self.inner.active.load(Ordering::SeqCst)
    }

    /// Whether a client is currently held by at least one lease.
    ///
    /// # Panics
    ///
    /// Panics if the client mutex is poisoned
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.inner
            .client
            .lock()
            .expect("client mutex poisoned")
            .as_ref()
            .is_some_and(|w| w.strong_count() > 0)
    }

    #[must_use]
    pub fn describe(&self) -> String {
        self.inner.connector.describe()
    }
}

impl fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("target", &self.describe())
            .field("active_leases", &self.active_leases())
            .finish()
    }
}

/// One session's share of the store client. Dropping it releases the share.
pub struct ConnectionLease {
    store: Arc<dyn DocumentStore>,
    manager: Arc<ManagerInner>,
}

impl fmt::Debug for ConnectionLease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionLease").finish_non_exhaustive()
    }
}

impl Deref for ConnectionLease {
    type Target = dyn DocumentStore;

    fn deref(&self) -> &Self::Target {
        self.store.as_ref()
    }
}

impl Drop for ConnectionLease {
    fn drop(&mut self) {
        let remaining = self.manager.active.fetch_sub(1, Ordering::SeqCst) - 1;
        if remaining == 0 {
            debug!(target_store = %self.manager.connector.describe(), "last lease released");
        }
    }
}
