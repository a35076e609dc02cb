//! In-memory `Connection` for driving the hub without sockets

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex, Notify};
use tokio::time::timeout;

use chat_hub::{
    Connection, ConnectionId, Hub, Payload, ReceiveError, Response, SendError, SharedConnection,
};

/// How long `next` waits before failing the test
const RECV_TIMEOUT: Duration = Duration::from_secs(2);

/// How long `assert_silent` listens
const SILENCE: Duration = Duration::from_millis(100);

/// Send timeout used by test hubs
pub const SEND_TIMEOUT: Duration = Duration::from_millis(200);

/// Scripted inbound item
pub enum Inbound {
    Payload(Payload),
    Fail(ReceiveError),
    Panic,
}

pub struct MockConnection {
    id: ConnectionId,
    inbound: Mutex<mpsc::UnboundedReceiver<Inbound>>,
    outbound: mpsc::UnboundedSender<Response>,
    fail_sends: AtomicBool,
    stall_sends: AtomicBool,
    stall_close: AtomicBool,
    closed: AtomicBool,
    close_notify: Notify,
}

#[async_trait]
impl Connection for MockConnection {
    fn id(&self) -> ConnectionId {
        self.id
    }

    async fn receive(&self) -> Result<Payload, ReceiveError> {
        let closed = self.close_notify.notified();
        if self.closed.load(Ordering::SeqCst) {
            return Err(ReceiveError::Closed);
        }

        let mut inbound = self.inbound.lock().await;
        tokio::select! {
            item = inbound.recv() => match item {
                Some(Inbound::Payload(payload)) => Ok(payload),
                Some(Inbound::Fail(err)) => Err(err),
                Some(Inbound::Panic) => panic!("injected read fault"),
                None => Err(ReceiveError::Closed),
            },
            _ = closed => Err(ReceiveError::Closed),
        }
    }

    async fn send(&self, response: &Response) -> Result<(), SendError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(SendError::Closed);
        }
        if self.stall_sends.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(SendError::Closed);
        }
        self.outbound
            .send(response.clone())
            .map_err(|_| SendError::Closed)
    }

    async fn close(&self) {
        if self.stall_close.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        self.closed.store(true, Ordering::SeqCst);
        self.close_notify.notify_waiters();
    }
}

/// Test-side handle: script input, observe output
pub struct MockClient {
    pub conn: Arc<MockConnection>,
    inbound: mpsc::UnboundedSender<Inbound>,
    outbound: mpsc::UnboundedReceiver<Response>,
}

impl MockClient {
    pub fn new() -> Self {
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let conn = Arc::new(MockConnection {
            id: ConnectionId::new(),
            inbound: Mutex::new(inbound_rx),
            outbound: outbound_tx,
            fail_sends: AtomicBool::new(false),
            stall_sends: AtomicBool::new(false),
            stall_close: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            close_notify: Notify::new(),
        });
        Self {
            conn,
            inbound: inbound_tx,
            outbound: outbound_rx,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.conn.id
    }

    pub fn shared(&self) -> SharedConnection {
        self.conn.clone()
    }

    pub fn push(&self, payload: Payload) {
        self.inbound.send(Inbound::Payload(payload)).unwrap();
    }

    pub fn fail_read(&self, err: ReceiveError) {
        self.inbound.send(Inbound::Fail(err)).unwrap();
    }

    pub fn panic_read(&self) {
        self.inbound.send(Inbound::Panic).unwrap();
    }

    pub fn set_fail_sends(&self, fail: bool) {
        self.conn.fail_sends.store(fail, Ordering::SeqCst);
    }

    pub fn set_stall_sends(&self, stall: bool) {
        self.conn.stall_sends.store(stall, Ordering::SeqCst);
    }

    /// Make `close` hang forever without marking the connection closed
    pub fn set_stall_close(&self, stall: bool) {
        self.conn.stall_close.store(stall, Ordering::SeqCst);
    }

    pub fn is_closed(&self) -> bool {
        self.conn.closed.load(Ordering::SeqCst)
    }

    /// Next response written to this connection
    pub async fn next(&mut self) -> Response {
        timeout(RECV_TIMEOUT, self.outbound.recv())
            .await
            .expect("timed out waiting for a response")
            .expect("outbound channel closed")
    }

    /// Assert nothing arrives within a short window
    pub async fn assert_silent(&mut self) {
        if let Ok(Some(response)) = timeout(SILENCE, self.outbound.recv()).await {
            panic!("unexpected response: {:?}", response);
        }
    }
}

/// Hub with its dispatcher already running
pub fn start_hub() -> Hub {
    let (hub, dispatcher) = Hub::new(64, SEND_TIMEOUT);
    tokio::spawn(dispatcher.run());
    hub
}

/// Accept a fresh mock connection and consume its connected acknowledgment
pub async fn connect(hub: &Hub) -> MockClient {
    let mut client = MockClient::new();
    hub.accept(client.shared()).await.unwrap();
    let ack = client.next().await;
    assert_eq!(ack.message, chat_hub::message::CONNECTED_MESSAGE);
    client
}

/// Connect and announce `name`, draining the resulting user lists
pub async fn connect_named(hub: &Hub, name: &str, others: &mut [&mut MockClient]) -> MockClient {
    let mut client = connect(hub).await;
    client.push(Payload::username(name));
    client.next().await;
    for other in others.iter_mut() {
        other.next().await;
    }
    client
}
