//! Error types for the hub
//!
//! Defines server-level errors plus the per-direction errors a
//! `Connection` can report. Uses thiserror for ergonomic error definitions.

use thiserror::Error;

use crate::types::ConnectionId;

/// Server-level errors
///
/// Everything here is fatal for the connection (or listener) it occurs on.
#[derive(Debug, Error)]
pub enum AppError {
    /// WebSocket protocol error, including handshake failure
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Outbound delivery failed while setting up a connection
    #[error("Send error: {0}")]
    Send(#[from] SendError),

    /// The connection is already in the registry
    #[error("Connection {0} already registered")]
    AlreadyRegistered(ConnectionId),
}

/// Outbound delivery errors
///
/// Any of these makes the connection a candidate for pruning.
#[derive(Debug, Error)]
pub enum SendError {
    /// The connection has already been closed
    #[error("Connection closed")]
    Closed,

    /// The send did not complete within the configured timeout
    #[error("Send timed out")]
    Timeout,

    /// The response could not be encoded
    #[error("Encode error: {0}")]
    Encode(#[from] serde_json::Error),

    /// The transport rejected the write
    #[error("Transport error: {0}")]
    Transport(#[from] tokio_tungstenite::tungstenite::Error),
}

/// Inbound read errors
///
/// Every variant ends the connection's read task.
#[derive(Debug, Error)]
pub enum ReceiveError {
    /// Close frame received or end of stream
    #[error("Connection closed")]
    Closed,

    /// The frame was not a valid payload
    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// The transport failed mid-read
    #[error("Transport error: {0}")]
    Transport(#[from] tokio_tungstenite::tungstenite::Error),
}

/// Registry business errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// Another live connection already holds this display name
    #[error("Username '{0}' is already taken")]
    NameTaken(String),
}
