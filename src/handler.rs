//! WebSocket connection handler
//!
//! Handles one accepted TCP stream: WebSocket handshake on the configured
//! path, then hands the upgraded socket to the hub.

use std::sync::Arc;

use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tracing::{debug, info};

use crate::connection::{SharedConnection, WsConnection};
use crate::error::AppError;
use crate::hub::Hub;

/// Handle a new TCP connection
///
/// A failed handshake returns before anything is registered. Otherwise
/// this waits until the connection's read task has finished.
pub async fn handle_connection(
    stream: TcpStream,
    hub: Hub,
    ws_path: Arc<str>,
) -> Result<(), AppError> {
    let peer_addr = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    debug!("New TCP connection from {}", peer_addr);

    // WebSocket handshake; only the configured path is upgraded
    let check_path = move |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
        if req.uri().path() == &*ws_path {
            Ok(resp)
        } else {
            let mut rejection = ErrorResponse::new(Some("Not Found".to_string()));
            *rejection.status_mut() = StatusCode::NOT_FOUND;
            Err(rejection)
        }
    };
    let ws_stream = tokio_tungstenite::accept_hdr_async(stream, check_path).await?;

    let conn: SharedConnection = Arc::new(WsConnection::new(ws_stream));
    let id = conn.id();
    info!("Connection {} upgraded from {}", id, peer_addr);

    let reader = hub.accept(conn).await?;
    if let Err(err) = reader.await {
        debug!("Read task for {} ended abnormally: {}", id, err);
    }

    info!("Connection {} finished", id);
    Ok(())
}
