use dashmap::DashMap;
use std::sync::Arc;
use tracing::debug;

use super::connection::{Connection, ConnectionId};

/// Set of live client connections.
///
/// Cheap to clone; all clones share the same membership. Shard locks are
/// only held while a single entry is inserted, removed or copied, never
/// across network I/O.
#[derive(Clone, Default)]
pub struct ConnectionRegistry {
    connections: Arc<DashMap<ConnectionId, Arc<Connection>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection. Adding the same connection twice is a no-op.
    pub fn add(&self, conn: Arc<Connection>) {
        if conn.is_closing() {
            return;
        }
        conn.activate();
        self.connections.entry(conn.id()).or_insert(conn);
    }

    pub fn remove(&self, id: &ConnectionId) {
        self.connections.remove(id);
    }

    /// Point-in-time copy of the members, safe to iterate while others
    /// connect and disconnect.
    pub fn snapshot(&self) -> Vec<Arc<Connection>> {
        self.connections
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }

    /// Start closing `conn` and drop it from the set.
    ///
    /// Read errors, ping failures and broadcast failures may all race here;
    /// only the first caller gets `true`.
    pub fn close(&self, conn: &Connection) -> bool {
        let first = conn.begin_close();
        self.remove(&conn.id());
        if first {
            debug!("Connection {} deregistered", conn.id());
        }
        first
    }

    pub fn close_all(&self) -> usize {
        self.snapshot()
            .iter()
            .filter(|conn| self.close(conn))
            .count()
    }

    pub fn contains(&self, id: &ConnectionId) -> bool {
        self.connections.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}
