//! Hub entry points
//!
//! `Hub` is the handle the accept path holds: it registers freshly
//! upgraded connections and spawns their read tasks. The matching
//! [`Dispatcher`] is created alongside it and must be run exactly once.

use std::sync::Arc;
use std::time::Duration;

use tokio::select;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::connection::SharedConnection;
use crate::dispatcher::{Dispatcher, Event};
use crate::error::{AppError, ReceiveError, SendError};
use crate::message::{Action, Payload, Response};
use crate::registry::{Eviction, Registry};

/// Default capacity of the inbound event queue
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// Default bound on a single outbound send
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(5);

/// Cheap, cloneable handle to the hub
#[derive(Clone)]
pub struct Hub {
    registry: Arc<Registry>,
    events: mpsc::Sender<Event>,
    send_timeout: Duration,
}

impl Hub {
    /// Create a hub and the dispatcher that serves it
    pub fn new(queue_capacity: usize, send_timeout: Duration) -> (Self, Dispatcher) {
        let registry = Arc::new(Registry::new());
        let (events, receiver) = mpsc::channel(queue_capacity.max(1));
        let dispatcher = Dispatcher::new(Arc::clone(&registry), receiver, send_timeout);

        let hub = Self {
            registry,
            events,
            send_timeout,
        };
        (hub, dispatcher)
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Acknowledge an upgraded connection, register it and start reading
    ///
    /// The acknowledgment is written before the connection enters the
    /// registry, so it is always the first response the client sees. If
    /// that write fails the connection is closed and never registered.
    /// Returns the read task's handle.
    pub async fn accept(&self, conn: SharedConnection) -> Result<JoinHandle<()>, AppError> {
        let id = conn.id();

        let ack = match timeout(self.send_timeout, conn.send(&Response::connected())).await {
            Ok(result) => result,
            Err(_) => Err(SendError::Timeout),
        };
        if let Err(err) = ack {
            warn!(conn = %id, "failed to acknowledge connection: {}", err);
            if timeout(self.send_timeout, conn.close()).await.is_err() {
                debug!(conn = %id, "close timed out");
            }
            return Err(err.into());
        }

        let Some(eviction) = self.registry.add(Arc::clone(&conn)).await else {
            return Err(AppError::AlreadyRegistered(id));
        };

        let total = self.registry.len().await;
        info!(conn = %id, total, "connection registered");
        Ok(spawn_reader(conn, eviction, self.events.clone()))
    }

    /// Close every registered connection
    ///
    /// Their read tasks then report `left` as usual.
    pub async fn shutdown(&self) {
        let ids: Vec<_> = self
            .registry
            .snapshot()
            .await
            .iter()
            .map(|conn| conn.id())
            .collect();
        let removed = self.registry.remove_all(&ids).await;
        info!(connections = removed.len(), "closing all connections");

        for conn in removed {
            if timeout(self.send_timeout, conn.close()).await.is_err() {
                debug!(conn = %conn.id(), "close timed out");
            }
        }
    }
}

/// How a read loop ended
enum ReadExit {
    /// The client sent `left`; it has already been forwarded
    Left,
    /// The connection was removed from the registry
    Evicted,
    /// The dispatcher queue is gone
    HubClosed,
    /// Reading failed
    Failed(ReceiveError),
}

/// Spawn the read task for one connection
///
/// The loop itself runs in an inner task so that a panic inside it is
/// caught here. Every exit except an explicit `left` is turned into one
/// synthetic `left` event for this connection.
fn spawn_reader(
    conn: SharedConnection,
    eviction: Eviction,
    events: mpsc::Sender<Event>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let id = conn.id();
        let exit = tokio::spawn(read_loop(Arc::clone(&conn), eviction, events.clone())).await;

        match exit {
            Ok(ReadExit::Left) => {
                debug!(conn = %id, "read task ended after left");
                return;
            }
            Ok(ReadExit::HubClosed) => {
                debug!(conn = %id, "hub closed, ending read task");
                return;
            }
            Ok(ReadExit::Evicted) => {
                debug!(conn = %id, "removed from registry, ending read task");
            }
            Ok(ReadExit::Failed(ReceiveError::Closed)) => {
                info!(conn = %id, "connection closed");
            }
            Ok(ReadExit::Failed(err)) => {
                warn!(conn = %id, "read failed: {}", err);
            }
            Err(err) => {
                error!(conn = %id, "read task aborted: {}", err);
            }
        }

        if events.send(Event::new(conn, Payload::left())).await.is_err() {
            debug!(conn = %id, "hub closed before left could be reported");
        }
    })
}

async fn read_loop(
    conn: SharedConnection,
    eviction: Eviction,
    events: mpsc::Sender<Event>,
) -> ReadExit {
    loop {
        let received = select! {
            biased;
            _ = eviction.wait() => return ReadExit::Evicted,
            received = conn.receive() => received,
        };
        let payload = match received {
            Ok(payload) => payload,
            Err(err) => return ReadExit::Failed(err),
        };

        let is_left = payload.action == Action::Left;
        if events
            .send(Event::new(Arc::clone(&conn), payload))
            .await
            .is_err()
        {
            return ReadExit::HubClosed;
        }
        if is_left {
            return ReadExit::Left;
        }
    }
}
