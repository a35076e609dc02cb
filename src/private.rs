//! Private message routing
//!
//! Resolves a display name to a live connection and delivers point to
//! point, echoing the same response back to the sender as confirmation.

use std::sync::Arc;

use futures_util::future::join;
use tracing::{debug, info};

use crate::broadcast::Broadcaster;
use crate::connection::SharedConnection;
use crate::message::{Payload, Response};
use crate::registry::Registry;

/// What happened to one private message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrivateOutcome {
    /// Recipient resolved; each flag says whether that send succeeded
    Delivered { recipient: bool, sender: bool },
    /// Nobody holds the name; the sender got an error response
    RecipientNotFound,
}

#[derive(Clone)]
pub struct PrivateRouter {
    registry: Arc<Registry>,
    broadcaster: Broadcaster,
}

impl PrivateRouter {
    pub fn new(registry: Arc<Registry>, broadcaster: Broadcaster) -> Self {
        Self {
            registry,
            broadcaster,
        }
    }

    /// Deliver `payload` from `source` to the connection named `payload.to`
    ///
    /// The two deliveries are independent: a failure on one side prunes
    /// that connection but does not affect the other send.
    pub async fn send_private(&self, source: &SharedConnection, payload: &Payload) -> PrivateOutcome {
        let Some(recipient) = self.registry.lookup(&payload.to).await else {
            debug!(conn = %source.id(), to = %payload.to, "private recipient not found");
            self.broadcaster
                .send_to(source, &Response::recipient_not_found(&payload.to))
                .await;
            return PrivateOutcome::RecipientNotFound;
        };

        let response = Response::private(&payload.username, &payload.to, &payload.message);
        let (recipient_ok, sender_ok) = join(
            self.broadcaster.send_to(&recipient, &response),
            self.broadcaster.send_to(source, &response),
        )
        .await;

        if recipient_ok {
            info!("Private message sent from {} to {}", payload.username, payload.to);
        }

        PrivateOutcome::Delivered {
            recipient: recipient_ok,
            sender: sender_ok,
        }
    }
}
