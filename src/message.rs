//! Message protocol definitions
//!
//! JSON objects exchanged over WebSocket text frames. Inbound payloads
//! carry an `action` discriminator plus flat string fields; outbound
//! responses omit every field that is empty for their action.

use chrono::Local;
use serde::{Deserialize, Serialize};

use crate::error::RegistryError;

/// Wall-clock format used for every outbound timestamp
const TIMESTAMP_FORMAT: &str = "%H:%M";

/// Text of the acknowledgment sent right after registration
pub const CONNECTED_MESSAGE: &str = "Connected to server";

/// Inbound action discriminator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Announce (or change) the sender's display name
    Username,
    /// Sender is leaving
    Left,
    /// Public message to everyone
    Broadcast,
    /// Point-to-point message to `to`
    Private,
}

/// Client → Server message
///
/// Missing string fields decode as empty strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payload {
    pub action: Action,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub to: String,
}

impl Payload {
    fn new(action: Action) -> Self {
        Self {
            action,
            username: String::new(),
            message: String::new(),
            to: String::new(),
        }
    }

    /// The `left` event a read task synthesizes when its connection dies
    pub fn left() -> Self {
        Self::new(Action::Left)
    }

    pub fn username(name: impl Into<String>) -> Self {
        Self {
            username: name.into(),
            ..Self::new(Action::Username)
        }
    }

    pub fn broadcast(username: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            message: message.into(),
            ..Self::new(Action::Broadcast)
        }
    }

    pub fn private(
        username: impl Into<String>,
        to: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            to: to.into(),
            message: message.into(),
            ..Self::new(Action::Private)
        }
    }
}

/// Outbound action discriminator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseAction {
    /// Current sorted list of named users
    ListUsers,
    /// Public message
    Broadcast,
    /// Private message (delivery and sender confirmation)
    Private,
    /// Error for the requesting connection only
    Error,
}

/// Server → Client message
///
/// `action` is absent only on the connected acknowledgment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Response {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<ResponseAction>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub message: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub message_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connected_users: Option<Vec<String>>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub from: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub to: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub timestamp: String,
}

impl Response {
    /// Acknowledgment sent once a connection is registered
    pub fn connected() -> Self {
        Self {
            message: CONNECTED_MESSAGE.to_string(),
            timestamp: timestamp(),
            ..Self::default()
        }
    }

    /// Presence update; `names` must already be sorted and non-empty-only
    pub fn list_users(names: Vec<String>) -> Self {
        Self {
            action: Some(ResponseAction::ListUsers),
            connected_users: Some(names),
            ..Self::default()
        }
    }

    pub fn broadcast(username: &str, message: &str) -> Self {
        Self {
            action: Some(ResponseAction::Broadcast),
            message: format!("{username}: {message}"),
            timestamp: timestamp(),
            ..Self::default()
        }
    }

    pub fn private(from: &str, to: &str, message: &str) -> Self {
        Self {
            action: Some(ResponseAction::Private),
            message: message.to_string(),
            message_type: "private".to_string(),
            from: from.to_string(),
            to: to.to_string(),
            timestamp: timestamp(),
            ..Self::default()
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            action: Some(ResponseAction::Error),
            message: message.into(),
            message_type: "error".to_string(),
            timestamp: timestamp(),
            ..Self::default()
        }
    }

    /// Error for a private message whose recipient is not registered
    pub fn recipient_not_found(to: &str) -> Self {
        Self {
            to: to.to_string(),
            ..Self::error(format!("User '{to}' not found or offline"))
        }
    }
}

/// Convert RegistryError to Response for client notification
impl From<RegistryError> for Response {
    fn from(err: RegistryError) -> Self {
        Response::error(err.to_string())
    }
}

/// Current server-local time as `HH:MM`
pub fn timestamp() -> String {
    Local::now().format(TIMESTAMP_FORMAT).to_string()
}
