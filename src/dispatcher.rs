//! Dispatcher implementation
//!
//! The single consumer of the hub's inbound queue. Every state-changing
//! event from every connection passes through here one at a time, in
//! arrival order.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::broadcast::Broadcaster;
use crate::connection::SharedConnection;
use crate::message::{Action, Payload, Response};
use crate::private::PrivateRouter;
use crate::registry::Registry;

/// An inbound payload tagged with the connection it came from
pub struct Event {
    pub source: SharedConnection,
    pub payload: Payload,
}

impl Event {
    pub fn new(source: SharedConnection, payload: Payload) -> Self {
        Self { source, payload }
    }
}

impl std::fmt::Debug for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Event")
            .field("source", &self.source.id())
            .field("payload", &self.payload)
            .finish()
    }
}

/// The hub's event loop
///
/// Owns the receiving end of the queue. The registry is shared with the
/// accept path, which registers connections without going through here.
pub struct Dispatcher {
    registry: Arc<Registry>,
    broadcaster: Broadcaster,
    router: PrivateRouter,
    receiver: mpsc::Receiver<Event>,
}

impl Dispatcher {
    pub fn new(
        registry: Arc<Registry>,
        receiver: mpsc::Receiver<Event>,
        send_timeout: Duration,
    ) -> Self {
        let broadcaster = Broadcaster::new(Arc::clone(&registry), send_timeout);
        let router = PrivateRouter::new(Arc::clone(&registry), broadcaster.clone());
        Self {
            registry,
            broadcaster,
            router,
            receiver,
        }
    }

    /// Run the event loop
    ///
    /// Continuously receives and processes events until all senders are dropped.
    pub async fn run(mut self) {
        info!("Dispatcher started");

        while let Some(event) = self.receiver.recv().await {
            self.handle_event(event).await;
        }

        info!("Dispatcher shutting down");
    }

    /// Process a single event
    pub async fn handle_event(&self, event: Event) {
        let Event { source, payload } = event;
        debug!(conn = %source.id(), action = ?payload.action, "event");

        // A removed connection may still have events in flight; only its
        // departure is processed.
        if payload.action != Action::Left && !self.registry.contains(source.id()).await {
            debug!(
                conn = %source.id(),
                action = ?payload.action,
                "event from unregistered connection dropped"
            );
            return;
        }

        match payload.action {
            Action::Username => self.handle_username(&source, &payload.username).await,
            Action::Left => self.handle_left(&source).await,
            Action::Broadcast => self.handle_broadcast(&payload).await,
            Action::Private => self.handle_private(&source, &payload).await,
        }
    }

    /// Handle a display name announcement
    async fn handle_username(&self, source: &SharedConnection, name: &str) {
        if let Err(err) = self.registry.set_name(source.id(), name).await {
            info!(conn = %source.id(), "username rejected: {}", err);
            self.broadcaster.send_to(source, &Response::from(err)).await;
            return;
        }

        info!(conn = %source.id(), "username set to '{}'", name);
        self.broadcast_user_list().await;
    }

    /// Handle an explicit or synthesized departure
    async fn handle_left(&self, source: &SharedConnection) {
        let id = source.id();
        let name = self.registry.name_of(id).await.unwrap_or_default();

        if let Some(conn) = self.registry.remove(id).await {
            info!(conn = %id, name = %name, "connection left");
            self.broadcaster.close(&conn).await;
        }

        self.broadcast_user_list().await;
    }

    /// Handle a public message
    async fn handle_broadcast(&self, payload: &Payload) {
        if payload.message.is_empty() {
            debug!(username = %payload.username, "empty broadcast dropped");
            return;
        }

        let response = Response::broadcast(&payload.username, &payload.message);
        self.broadcaster.broadcast_to_all(&response).await;
    }

    /// Handle a private message
    async fn handle_private(&self, source: &SharedConnection, payload: &Payload) {
        self.router.send_private(source, payload).await;
    }

    async fn broadcast_user_list(&self) {
        let names = self.registry.sorted_names().await;
        self.broadcaster
            .broadcast_to_all(&Response::list_users(names))
            .await;
    }
}
