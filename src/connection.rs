//! Connection abstraction
//!
//! The hub only ever talks to a `Connection`: a duplex channel to one
//! client that decodes inbound payloads and encodes outbound responses.
//! `WsConnection` is the WebSocket implementation; tests plug in their own.

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::WebSocketStream;
use tracing::debug;

use crate::error::{ReceiveError, SendError};
use crate::message::{Payload, Response};
use crate::types::ConnectionId;

/// Shared handle held jointly by a read task and the Registry
pub type SharedConnection = Arc<dyn Connection>;

/// A live bidirectional message channel to one client
///
/// `receive` is only ever called by the connection's own read task.
/// `send` may be called concurrently from the dispatcher path.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Identity of this connection
    fn id(&self) -> ConnectionId;

    /// Wait for the next inbound payload
    async fn receive(&self) -> Result<Payload, ReceiveError>;

    /// Write one response to the client
    async fn send(&self, response: &Response) -> Result<(), SendError>;

    /// Close the underlying channel. Idempotent.
    async fn close(&self);
}

/// WebSocket-backed connection
///
/// The socket is split so a blocked read never holds up a write.
pub struct WsConnection<S> {
    id: ConnectionId,
    sink: Mutex<SplitSink<WebSocketStream<S>, Message>>,
    stream: Mutex<SplitStream<WebSocketStream<S>>>,
}

impl<S> WsConnection<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    /// Wrap a socket that has completed its handshake
    pub fn new(ws: WebSocketStream<S>) -> Self {
        let (sink, stream) = ws.split();
        Self {
            id: ConnectionId::new(),
            sink: Mutex::new(sink),
            stream: Mutex::new(stream),
        }
    }
}

#[async_trait]
impl<S> Connection for WsConnection<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    fn id(&self) -> ConnectionId {
        self.id
    }

    async fn receive(&self) -> Result<Payload, ReceiveError> {
        let mut stream = self.stream.lock().await;

        while let Some(frame) = stream.next().await {
            match frame? {
                Message::Text(text) => return Ok(serde_json::from_str(&text)?),
                Message::Close(_) => {
                    debug!(conn = %self.id, "close frame received");
                    return Err(ReceiveError::Closed);
                }
                // Pong replies are queued by tungstenite itself
                Message::Ping(_) | Message::Pong(_) => {}
                Message::Binary(_) | Message::Frame(_) => {}
            }
        }

        Err(ReceiveError::Closed)
    }

    async fn send(&self, response: &Response) -> Result<(), SendError> {
        let json = serde_json::to_string(response)?;
        self.sink
            .lock()
            .await
            .send(Message::Text(json.into()))
            .await
            .map_err(|err| match err {
                WsError::ConnectionClosed | WsError::AlreadyClosed => SendError::Closed,
                other => SendError::Transport(other),
            })
    }

    async fn close(&self) {
        if let Err(err) = self.sink.lock().await.close().await {
            debug!(conn = %self.id, "close failed: {}", err);
        }
    }
}
