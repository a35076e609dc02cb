//! Broadcaster
//!
//! Fans one response out to every live connection. The registry is only
//! read (snapshot) before the sends and written (prune) after them; no lock
//! is held while a send is in flight.

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::connection::SharedConnection;
use crate::error::SendError;
use crate::message::Response;
use crate::registry::Registry;
use crate::types::ConnectionId;

/// Result of one fan-out pass
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Connections the response reached
    pub delivered: usize,
    /// Connections removed because their send failed
    pub pruned: Vec<ConnectionId>,
}

/// Send-side of the hub: fan-out, single delivery and pruning
#[derive(Clone)]
pub struct Broadcaster {
    registry: Arc<Registry>,
    send_timeout: Duration,
}

impl Broadcaster {
    pub fn new(registry: Arc<Registry>, send_timeout: Duration) -> Self {
        Self {
            registry,
            send_timeout,
        }
    }

    /// Send `response` to every registered connection
    ///
    /// Sends run concurrently, each bounded by the send timeout. Every
    /// connection whose send fails is removed in one exclusive pass and
    /// closed; the others are untouched.
    pub async fn broadcast_to_all(&self, response: &Response) -> BroadcastReport {
        let snapshot = self.registry.snapshot().await;
        let results = join_all(snapshot.iter().map(|conn| self.deliver(conn, response))).await;

        let mut failed = Vec::with_capacity(snapshot.len());
        for (conn, result) in snapshot.iter().zip(results) {
            if let Err(err) = result {
                warn!(conn = %conn.id(), "broadcast send failed: {}", err);
                failed.push(conn.id());
            }
        }

        let delivered = snapshot.len() - failed.len();
        let pruned = self.prune(&failed).await;
        debug!(delivered, pruned = pruned.len(), "broadcast complete");

        BroadcastReport { delivered, pruned }
    }

    /// Send `response` to one connection, pruning it on failure
    ///
    /// Returns true if the response was written.
    pub async fn send_to(&self, conn: &SharedConnection, response: &Response) -> bool {
        match self.deliver(conn, response).await {
            Ok(()) => true,
            Err(err) => {
                warn!(conn = %conn.id(), "send failed: {}", err);
                self.prune(&[conn.id()]).await;
                false
            }
        }
    }

    /// Remove connections from the registry and close their channels
    ///
    /// Returns the ids that were still registered.
    pub async fn prune(&self, ids: &[ConnectionId]) -> Vec<ConnectionId> {
        let removed = self.registry.remove_all(ids).await;
        join_all(removed.iter().map(|conn| self.close(conn))).await;
        removed.iter().map(|conn| conn.id()).collect()
    }

    /// Close one channel, giving up after the send timeout
    pub async fn close(&self, conn: &SharedConnection) {
        if timeout(self.send_timeout, conn.close()).await.is_err() {
            debug!(conn = %conn.id(), "close timed out");
        }
    }

    async fn deliver(&self, conn: &SharedConnection, response: &Response) -> Result<(), SendError> {
        match timeout(self.send_timeout, conn.send(response)).await {
            Ok(result) => result,
            Err(_) => Err(SendError::Timeout),
        }
    }
}
