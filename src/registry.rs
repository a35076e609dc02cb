//! Connection registry
//!
//! Maps every live connection to its display name (empty until the client
//! announces one). All operations are safe under concurrent callers: reads
//! take the shared lock, mutations take the exclusive lock.
//!
//! # Locking
//! There is exactly one lock. It is never held across a `send`/`receive`:
//! callers take a snapshot, do their I/O, then come back with
//! [`Registry::remove_all`] to prune whatever failed.
//!
//! Removal fires the entry's [`Eviction`] signal, which ends the
//! connection's read task even if closing the channel stalls.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Notify, RwLock};
use tracing::debug;

use crate::connection::SharedConnection;
use crate::error::RegistryError;
use crate::types::ConnectionId;

/// Fired once when a connection leaves the registry
///
/// Held by the connection's read task. A removal that happens before the
/// task starts waiting is not lost.
#[derive(Clone, Default)]
pub struct Eviction(Arc<Notify>);

impl Eviction {
    /// Wait until the connection has been removed
    pub async fn wait(&self) {
        self.0.notified().await;
    }

    fn fire(&self) {
        self.0.notify_one();
    }
}

struct Entry {
    conn: SharedConnection,
    name: String,
    /// Registration order, used to keep snapshots stable
    seq: u64,
    evicted: Eviction,
}

impl Entry {
    fn evict(self) -> SharedConnection {
        self.evicted.fire();
        self.conn
    }
}

#[derive(Default)]
struct RegistryState {
    entries: HashMap<ConnectionId, Entry>,
    next_seq: u64,
}

/// Concurrency-safe store of live connections and their display names
///
/// Display names are unique among live connections; a clash is rejected
/// with [`RegistryError::NameTaken`].
#[derive(Default)]
pub struct Registry {
    state: RwLock<RegistryState>,
}

impl Registry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a connection with an empty name
    ///
    /// Returns the signal fired on its removal, or None if the connection
    /// was already registered (the existing entry is kept).
    pub async fn add(&self, conn: SharedConnection) -> Option<Eviction> {
        let mut state = self.state.write().await;
        let id = conn.id();
        if state.entries.contains_key(&id) {
            return None;
        }

        let seq = state.next_seq;
        state.next_seq += 1;
        let evicted = Eviction::default();
        state.entries.insert(
            id,
            Entry {
                conn,
                name: String::new(),
                seq,
                evicted: evicted.clone(),
            },
        );
        debug!(conn = %id, total = state.entries.len(), "registered");
        Some(evicted)
    }

    /// Delete a connection; absent connections are a no-op
    pub async fn remove(&self, id: ConnectionId) -> Option<SharedConnection> {
        let mut state = self.state.write().await;
        let entry = state.entries.remove(&id)?;
        debug!(conn = %id, total = state.entries.len(), "unregistered");
        Some(entry.evict())
    }

    /// Delete several connections in one exclusive pass
    ///
    /// Returns the handles that were actually present so the caller can
    /// close them outside the lock.
    pub async fn remove_all(&self, ids: &[ConnectionId]) -> Vec<SharedConnection> {
        if ids.is_empty() {
            return Vec::new();
        }

        let mut state = self.state.write().await;
        let removed: Vec<_> = ids
            .iter()
            .filter_map(|id| state.entries.remove(id))
            .map(Entry::evict)
            .collect();
        debug!(
            removed = removed.len(),
            total = state.entries.len(),
            "pruned connections"
        );
        removed
    }

    /// Set the display name of a registered connection
    ///
    /// An absent connection is a no-op (it may have just disconnected).
    /// The empty name makes the connection anonymous again.
    pub async fn set_name(&self, id: ConnectionId, name: &str) -> Result<(), RegistryError> {
        let mut state = self.state.write().await;

        let taken = !name.is_empty()
            && state
                .entries
                .iter()
                .any(|(other, entry)| *other != id && entry.name == name);
        if taken {
            return Err(RegistryError::NameTaken(name.to_string()));
        }

        match state.entries.get_mut(&id) {
            Some(entry) => entry.name = name.to_string(),
            None => debug!(conn = %id, "set_name on unregistered connection ignored"),
        }
        Ok(())
    }

    /// Find the connection holding `name`
    ///
    /// The empty name never matches: anonymous connections are not
    /// addressable.
    pub async fn lookup(&self, name: &str) -> Option<SharedConnection> {
        if name.is_empty() {
            return None;
        }

        let state = self.state.read().await;
        state
            .entries
            .values()
            .find(|entry| entry.name == name)
            .map(|entry| entry.conn.clone())
    }

    /// Point-in-time copy of all live connections, in registration order
    pub async fn snapshot(&self) -> Vec<SharedConnection> {
        let state = self.state.read().await;
        let mut entries: Vec<&Entry> = state.entries.values().collect();
        entries.sort_by_key(|entry| entry.seq);
        entries.into_iter().map(|entry| entry.conn.clone()).collect()
    }

    /// Ascending list of non-empty display names
    pub async fn sorted_names(&self) -> Vec<String> {
        let state = self.state.read().await;
        let mut names: Vec<String> = state
            .entries
            .values()
            .filter(|entry| !entry.name.is_empty())
            .map(|entry| entry.name.clone())
            .collect();
        names.sort();
        names
    }

    /// Current display name of a connection, if registered
    pub async fn name_of(&self, id: ConnectionId) -> Option<String> {
        let state = self.state.read().await;
        state.entries.get(&id).map(|entry| entry.name.clone())
    }

    pub async fn contains(&self, id: ConnectionId) -> bool {
        self.state.read().await.entries.contains_key(&id)
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
