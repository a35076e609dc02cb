//! TCP accept loop
//!
//! Binds the listener, starts the dispatcher once for the lifetime of the
//! server and spawns one handler task per accepted connection.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tokio::select;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::AppError;
use crate::handler::handle_connection;
use crate::hub::Hub;

pub struct Server {
    listener: TcpListener,
    hub: Hub,
    ws_path: Arc<str>,
}

impl Server {
    /// Bind the listener and start the dispatcher
    pub async fn bind(config: &Config) -> Result<Self, AppError> {
        let listener = TcpListener::bind(config.bind_addr()).await?;

        let (hub, dispatcher) = Hub::new(config.queue_capacity, config.send_timeout());
        tokio::spawn(dispatcher.run());

        Ok(Self {
            listener,
            hub,
            ws_path: Arc::from(config.ws_path.as_str()),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn hub(&self) -> &Hub {
        &self.hub
    }

    /// Accept connections until `shutdown` resolves, then close them all
    pub async fn run_until<F>(self, shutdown: F) -> Result<(), AppError>
    where
        F: Future<Output = ()> + Send,
    {
        tokio::pin!(shutdown);
        info!("WebSocket hub listening on {}", self.local_addr()?);

        loop {
            select! {
                _ = &mut shutdown => {
                    info!("Shutdown signal received");
                    break;
                }
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, addr)) => {
                        info!("New connection from {}", addr);
                        self.spawn_handler(stream);
                    }
                    Err(e) => {
                        error!("Failed to accept connection: {}", e);
                    }
                },
            }
        }

        self.hub.shutdown().await;
        Ok(())
    }

    pub async fn run_until_ctrl_c(self) -> Result<(), AppError> {
        self.run_until(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!(error = ?err, "failed to install ctrl-c handler");
            }
        })
        .await
    }

    fn spawn_handler(&self, stream: TcpStream) {
        let hub = self.hub.clone();
        let ws_path = Arc::clone(&self.ws_path);

        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, hub, ws_path).await {
                warn!("Connection handler error: {}", e);
            }
        });
    }
}
