//! Connection registry
//!
//! The authoritative set of live connections. Entries are kept in an ordered
//! map keyed by `ConnectionId`, so iteration always follows join order.
//! Broadcasts iterate a snapshot taken under the read lock and never hold the
//! lock while delivering.

use super::{ClientRecord, ConnectionId};
use crate::protocol::{CloseCode, Frame};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Registry of all live relay connections
pub struct ConnectionRegistry {
    /// Next id to hand out
    next_id: AtomicU64,

    /// Live connections in join order
    clients: RwLock<BTreeMap<ConnectionId, Arc<ClientRecord>>>,
}

impl ConnectionRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            clients: RwLock::new(BTreeMap::new()),
        }
    }

    /// Create an empty registry wrapped in Arc
    #[must_use]
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Register a new connection
    pub fn add(
        &self,
        remote_addr: impl Into<String>,
        sender: mpsc::Sender<Frame>,
    ) -> Arc<ClientRecord> {
        let id = ConnectionId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        let record = Arc::new(ClientRecord::new(id, remote_addr.into(), sender));

        self.clients.write().insert(id, record.clone());

        tracing::debug!(connection_id = %id, "Connection added");

        record
    }

    /// Deregister a connection
    ///
    /// Returns `None` if it was already gone; both the close path and the
    /// liveness monitor may call this for the same connection.
    pub fn remove(&self, id: ConnectionId) -> Option<Arc<ClientRecord>> {
        let removed = self.clients.write().remove(&id);

        if removed.is_some() {
            tracing::debug!(connection_id = %id, "Connection removed");
        }

        removed
    }

    /// Look up a connection
    pub fn get(&self, id: ConnectionId) -> Option<Arc<ClientRecord>> {
        self.clients.read().get(&id).cloned()
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.clients.read().contains_key(&id)
    }

    /// Current connections in join order
    pub fn snapshot(&self) -> Vec<Arc<ClientRecord>> {
        self.clients.read().values().cloned().collect()
    }

    /// Visit every current connection in join order
    ///
    /// The visitor runs outside the lock, so it may add or remove entries.
    pub fn for_each<F>(&self, mut visit: F)
    where
        F: FnMut(&Arc<ClientRecord>),
    {
        for record in self.snapshot() {
            visit(&record);
        }
    }

    pub fn len(&self) -> usize {
        self.clients.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.read().is_empty()
    }

    /// Request a close on every connection, returning how many were asked
    pub fn close_all(&self, code: CloseCode) -> usize {
        let mut closed = 0;
        self.for_each(|record| {
            if record.close(code) {
                closed += 1;
            }
        });

        if closed > 0 {
            tracing::info!(count = closed, code = %code, "Closing all connections");
        }

        closed
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ConnectionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionRegistry")
            .field("connections", &self.len())
            .finish()
    }
}
